//! # Medo报告模块
//!
//! 临床所见到患者说明的规则翻译，以及结构化报告的组装。

pub mod composer;
pub mod rules;
pub mod translator;

pub use composer::{ReportComposer, ReportTemplate};
pub use rules::{IdempotenceViolation, RuleSet, RuleSpec, TranslationRule};
pub use translator::ReportTranslator;
