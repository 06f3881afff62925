//! 翻译规则
//!
//! 规则按声明顺序执行，后一条规则作用于前一条规则的输出。
//! 更具体的模式必须排在包含它的更一般的模式之前，否则一般规则会先吃掉子串。

use medo_core::{MedoError, Result};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// 规则的可序列化描述（用于配置文件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub replacement: String,
}

impl RuleSpec {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// 单条翻译规则：大小写不敏感的模式及其替换文本
#[derive(Debug, Clone)]
pub struct TranslationRule {
    pattern: String,
    replacement: String,
    regex: Regex,
}

impl TranslationRule {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| MedoError::Config(format!("翻译规则 {:?} 无效: {}", pattern, e)))?;

        Ok(Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// 替换所有不重叠的匹配，替换文本按字面处理
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.regex.replace_all(text, NoExpand(&self.replacement))
    }
}

/// 幂等性冲突：某条规则的模式匹配了某条规则的输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotenceViolation {
    pub pattern: String,
    pub matched_replacement: String,
}

/// 有序、只读的规则集
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<TranslationRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<TranslationRule>) -> Self {
        Self { rules }
    }

    /// 从配置描述构建规则集，保持声明顺序
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs
            .iter()
            .map(|spec| TranslationRule::new(&spec.pattern, &spec.replacement))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// 内置规则
    pub fn default_specs() -> Vec<RuleSpec> {
        vec![
            RuleSpec::new(
                "right lower lobe consolidation with air bronchograms",
                "There is likely pneumonia in the lower part of your right lung.",
            ),
            RuleSpec::new(
                "consolidation",
                "a dense area in the lung, often due to infection (like pneumonia)",
            ),
        ]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslationRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 检查规则输出是否会被任何规则再次匹配
    pub fn check_idempotent(&self) -> Vec<IdempotenceViolation> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            for output in &self.rules {
                if rule.is_match(output.replacement()) {
                    violations.push(IdempotenceViolation {
                        pattern: rule.pattern().to_string(),
                        matched_replacement: output.replacement().to_string(),
                    });
                }
            }
        }
        violations
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        let rules = Self::default_specs()
            .iter()
            .filter_map(|spec| TranslationRule::new(&spec.pattern, &spec.replacement).ok())
            .collect();

        Self { rules }
    }
}
