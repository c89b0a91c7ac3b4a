use serde::{Deserialize, Serialize};

/// Indicator characters used to classify a form title along two axes:
/// payment mode (credit vs. cash) and direction (payment vs. receipt).
///
/// Matching is per character, so a title garbled by recognition
/// (e.g. `ッ払`) still carries enough signal to be classified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TitleCharsets {
    pub credit: Vec<char>,
    pub cash: Vec<char>,
    pub payment: Vec<char>,
    pub receipt: Vec<char>,
}

impl Default for TitleCharsets {
    fn default() -> Self {
        Self {
            credit: vec!['ク', 'レ', 'ジ', 'ッ', 'ト'],
            cash: vec!['現', '金'],
            payment: vec!['支', '払'],
            receipt: vec!['受', '入'],
        }
    }
}

impl TitleCharsets {
    pub fn any_credit(&self, text: &str) -> bool {
        contains_any(text, &self.credit)
    }

    pub fn any_cash(&self, text: &str) -> bool {
        contains_any(text, &self.cash)
    }

    pub fn any_payment(&self, text: &str) -> bool {
        contains_any(text, &self.payment)
    }

    pub fn any_receipt(&self, text: &str) -> bool {
        contains_any(text, &self.receipt)
    }
}

fn contains_any(text: &str, set: &[char]) -> bool {
    text.chars().any(|c| set.contains(&c))
}
