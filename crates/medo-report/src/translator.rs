//! 报告翻译引擎
//!
//! 把临床术语按规则链改写为患者可读的文字。这是确定性的文本替换，不是医学NLP模型。

use crate::rules::RuleSet;
use std::sync::Arc;
use tracing::debug;

/// 报告翻译器
#[derive(Debug, Clone)]
pub struct ReportTranslator {
    rules: Arc<RuleSet>,
}

impl Default for ReportTranslator {
    fn default() -> Self {
        Self::new(Arc::new(RuleSet::default()))
    }
}

impl ReportTranslator {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// 依次应用每条规则，每条规则作用于上一条规则的输出
    pub fn translate(&self, text: &str) -> String {
        let mut current = text.to_string();

        for rule in self.rules.iter() {
            if rule.is_match(&current) {
                debug!("翻译规则命中: {:?}", rule.pattern());
                current = rule.apply(&current).into_owned();
            }
        }

        current
    }
}
