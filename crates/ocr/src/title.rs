use suito_core::{FormTitle, TitleCharsets};
use tracing::info;

/// Maps a raw, possibly garbled title onto one of the four form categories.
///
/// Each axis (credit vs. cash, payment vs. receipt) must be decided by exactly
/// one side; if either axis is ambiguous the raw title is returned as is.
#[derive(Debug, Clone, Default)]
pub struct TitleNormalizer {
    charsets: TitleCharsets,
}

impl TitleNormalizer {
    pub fn new(charsets: TitleCharsets) -> Self {
        Self { charsets }
    }

    pub fn classify(&self, raw: &str) -> Option<FormTitle> {
        let cs = &self.charsets;
        let credit = cs.any_credit(raw);
        let cash = cs.any_cash(raw);
        let payment = cs.any_payment(raw);
        let receipt = cs.any_receipt(raw);

        match (credit, cash, payment, receipt) {
            (true, false, true, false) => Some(FormTitle::CreditPayment),
            (true, false, false, true) => Some(FormTitle::CreditReceipt),
            (false, true, true, false) => Some(FormTitle::CashPayment),
            (false, true, false, true) => Some(FormTitle::CashReceipt),
            _ => None,
        }
    }

    pub fn normalize(&self, raw: &str) -> String {
        match self.classify(raw) {
            Some(title) => {
                let canonical = title.as_str();
                if canonical != raw {
                    info!(raw, canonical, "title normalized");
                }
                canonical.to_string()
            }
            None => raw.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> String {
        TitleNormalizer::default().normalize(raw)
    }

    #[test]
    fn garbled_credit_payment_title() {
        assert_eq!(normalize("出納表(クレジット支払)"), "クレジット支払");
        assert_eq!(normalize("ッ払"), "クレジット支払");
    }

    #[test]
    fn all_four_categories() {
        assert_eq!(normalize("クレジット受入れ"), "クレジット受入");
        assert_eq!(normalize("現金支払い"), "現金支払");
        assert_eq!(normalize("現金受入表"), "現金受入");
    }

    #[test]
    fn credit_and_cash_together_is_unchanged() {
        let raw = "現金・クレジット支払";
        assert_eq!(normalize(raw), raw);
    }

    #[test]
    fn payment_and_receipt_together_is_unchanged() {
        let raw = "現金支払受入";
        assert_eq!(normalize(raw), raw);
    }

    #[test]
    fn missing_axis_is_unchanged() {
        assert_eq!(normalize("出納表"), "出納表");
        assert_eq!(normalize("現金"), "現金");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "出納表(クレジット支払)",
            "ッ払",
            "現金受入表",
            "現金・クレジット支払",
            "出納表",
            "",
            "クレジット受入",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn custom_charsets_are_honoured() {
        let normalizer = TitleNormalizer::new(TitleCharsets {
            credit: vec!['C'],
            cash: vec!['K'],
            payment: vec!['P'],
            receipt: vec!['R'],
        });
        assert_eq!(normalizer.classify("CP"), Some(FormTitle::CreditPayment));
        assert_eq!(normalizer.classify("KR"), Some(FormTitle::CashReceipt));
        assert_eq!(normalizer.classify("CKP"), None);
    }
}
