//! # Medo上传模块
//!
//! 上传文件的验证策略以及批次级的全有或全无处理流水线。

pub mod pipeline;
pub mod validator;

pub use pipeline::{BatchResult, IngestionPipeline};
pub use validator::{UploadPolicy, UploadValidator, Verdict};
