//! Dynamic label length optimization.
//!
//! Applies lossless passes (whitespace, phrase table, abbreviations,
//! duplicate-word removal) in order and falls back to boundary-aware
//! truncation only when the text still exceeds the target. Lengths are
//! counted in Unicode scalar values, matching the one-byte-per-code-point
//! DAB mapping.

use crate::charset;
use serde::Deserialize;

/// Replacement tables. Defaults cover the common English and Thai broadcast
/// phrases; stations extend them from the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerRules {
    /// Phrase → replacement, applied on substrings.
    pub phrases: Vec<(String, String)>,
    /// Word → abbreviation for English text.
    pub abbreviations_en: Vec<(String, String)>,
    /// Word → abbreviation for Thai text.
    pub abbreviations_th: Vec<(String, String)>,
}

impl Default for OptimizerRules {
    fn default() -> Self {
        Self {
            phrases: [
                ("Now Playing", "♪"),
                ("Coming Up", "Next:"),
                ("Breaking News", "BREAKING:"),
                ("Weather Update", "Weather:"),
                ("Traffic Alert", "Traffic:"),
                ("กำลังเล่น", "♪"),
                ("ข่าวด่วน", "ด่วน:"),
                ("สภาพอากาศ", "อากาศ:"),
                ("การจราจร", "จราจร:"),
            ]
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .to_vec(),
            abbreviations_en: [
                ("information", "info"),
                ("and", "&"),
                ("without", "w/o"),
                ("with", "w/"),
                ("tonight", "tonite"),
                ("tomorrow", "tmrw"),
                ("today", "2day"),
            ]
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .to_vec(),
            abbreviations_th: [
                ("ข้อมูล", "ข้อม."),
                ("รายการ", "ราย."),
                ("โครงการ", "โครง."),
                ("กิจกรรม", "กิจ."),
                ("มหาวิทยาลัย", "ม."),
                ("จังหวัด", "จ."),
                ("ประเทศไทย", "ไทย"),
            ]
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeResult {
    pub text: String,
    pub original_len: usize,
    pub optimized_len: usize,
    pub compression_ratio: f64,
    pub applied_rules: Vec<String>,
    pub is_lossless: bool,
}

pub struct LengthOptimizer {
    rules: OptimizerRules,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl LengthOptimizer {
    pub fn new(rules: OptimizerRules) -> Self {
        Self { rules }
    }

    pub fn optimize(&self, text: &str, target_len: usize) -> OptimizeResult {
        let original_len = char_len(text);
        let mut applied = Vec::new();

        if original_len <= target_len {
            return OptimizeResult {
                text: text.to_string(),
                original_len,
                optimized_len: original_len,
                compression_ratio: 1.0,
                applied_rules: applied,
                is_lossless: true,
            };
        }

        let mut current = compress_whitespace(text);
        if char_len(&current) != original_len {
            applied.push("whitespace".to_string());
        }

        for (phrase, replacement) in &self.rules.phrases {
            if current.contains(phrase.as_str()) {
                current = current.replace(phrase.as_str(), replacement);
                applied.push(format!("phrase:{phrase}"));
            }
        }

        let abbreviations = if charset::contains_thai(&current) {
            &self.rules.abbreviations_th
        } else {
            &self.rules.abbreviations_en
        };
        for (word, abbrev) in abbreviations {
            let replaced = replace_word(&current, word, abbrev);
            if replaced != current {
                current = replaced;
                applied.push(format!("abbreviation:{word}"));
            }
        }

        let deduplicated = remove_consecutive_duplicates(&current);
        if deduplicated != current {
            current = deduplicated;
            applied.push("duplicate-words".to_string());
        }

        let mut lossless = true;
        if char_len(&current) > target_len {
            current = smart_truncate(&current, target_len);
            applied.push("truncate".to_string());
            lossless = false;
        }

        let optimized_len = char_len(&current);
        OptimizeResult {
            text: current,
            original_len,
            optimized_len,
            compression_ratio: optimized_len as f64 / original_len as f64,
            applied_rules: applied,
            is_lossless: lossless,
        }
    }
}

fn compress_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace whole words only, so "with" never rewrites "without".
fn replace_word(text: &str, word: &str, replacement: &str) -> String {
    text.split(' ')
        .map(|token| if token == word { replacement } else { token })
        .collect::<Vec<_>>()
        .join(" ")
}

fn remove_consecutive_duplicates(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for token in text.split(' ') {
        if out.last() != Some(&token) {
            out.push(token);
        }
    }
    out.join(" ")
}

/// Truncate at the largest whitespace/punctuation boundary `k` with
/// `0.7·target ≤ k ≤ target−3`, appending an ellipsis. Falls back to a hard
/// cut at `target−3` when no boundary exists in the window.
fn smart_truncate(text: &str, target_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= target_len {
        return text.to_string();
    }
    if target_len < 4 {
        return chars[..target_len.min(chars.len())].iter().collect();
    }

    let limit = target_len - 3;
    let floor = (target_len as f64 * 0.7).ceil() as usize;
    let mut cut = limit;
    for k in (floor..=limit).rev() {
        let c = chars[k];
        if c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?' | ';' | ':') {
            cut = k;
            break;
        }
    }

    let mut out: String = chars[..cut].iter().collect();
    out.truncate(out.trim_end().len());
    out.push_str("...");
    out
}
