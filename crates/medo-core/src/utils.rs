//! 通用工具函数

/// 规范化MIME类型：去掉参数部分，转为小写
pub fn normalize_mime_type(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// 判断文件名是否以指定扩展名结尾（忽略大小写）
pub fn has_extension(file_name: &str, extension: &str) -> bool {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    file_name.len() >= suffix.len()
        && file_name.is_char_boundary(file_name.len() - suffix.len())
        && file_name[file_name.len() - suffix.len()..].eq_ignore_ascii_case(&suffix)
}
