//! Cultural-appropriateness validation for broadcast text.
//!
//! Token lists are configuration, not code: broadcasters tune them per
//! licence conditions. The validator itself is pure and deterministic.

use serde::Deserialize;

/// Token lists driving the verdicts. Defaults cover common Thai broadcast
/// vocabulary; all three lists are overridable from the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Tokens that make a text inappropriate for broadcast.
    pub disallowed_tokens: Vec<String>,
    /// Royal vocabulary requiring special on-air formatting.
    pub royal_tokens: Vec<String>,
    /// Religious vocabulary requiring respectful treatment.
    pub religious_tokens: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            disallowed_tokens: ["เฮ้ย", "ชิบหาย", "บ้า", "โง่", "งี่เง่า"]
                .map(String::from)
                .to_vec(),
            royal_tokens: [
                "พระบาทสมเด็จพระเจ้าอยู่หัว",
                "สมเด็จพระนางเจ้า",
                "พระองค์",
                "พระราชา",
                "พระราชินี",
                "เจ้าฟ้า",
                "หม่อมเจ้า",
                "หม่อมราชวงศ์",
            ]
            .map(String::from)
            .to_vec(),
            religious_tokens: [
                "พระพุทธเจ้า",
                "พระธรรม",
                "พระสงฆ์",
                "วัด",
                "หลวงพ่อ",
                "หลวงปู่",
                "พุทธศาสนา",
                "นิพพาน",
                "ศีล",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Outcome of validating one text.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Verdict {
    pub is_appropriate: bool,
    pub contains_royal: bool,
    pub contains_religious: bool,
    pub requires_special_formatting: bool,
    /// 1.0 for clean text, −0.2 per disallowed token found, clamped at 0.
    pub sensitivity: f64,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

pub struct ContentValidator {
    config: ValidatorConfig,
}

impl ContentValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, text: &str) -> Verdict {
        let mut verdict = Verdict {
            is_appropriate: true,
            contains_royal: false,
            contains_religious: false,
            requires_special_formatting: false,
            sensitivity: 1.0,
            warnings: Vec::new(),
            suggestions: Vec::new(),
        };

        for token in &self.config.disallowed_tokens {
            if text.contains(token.as_str()) {
                verdict.is_appropriate = false;
                verdict.sensitivity -= 0.2;
                verdict
                    .warnings
                    .push(format!("contains disallowed language: {token}"));
            }
        }
        verdict.sensitivity = verdict.sensitivity.max(0.0);

        for token in &self.config.royal_tokens {
            if text.contains(token.as_str()) {
                verdict.contains_royal = true;
                verdict
                    .suggestions
                    .push(format!("royal reference \"{token}\" requires respectful formatting"));
            }
        }
        verdict.requires_special_formatting = verdict.contains_royal;

        for token in &self.config.religious_tokens {
            if text.contains(token.as_str()) {
                verdict.contains_religious = true;
                verdict
                    .suggestions
                    .push(format!("religious reference \"{token}\" requires respectful treatment"));
            }
        }

        verdict
    }
}
