use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw card data. Only ever forwarded to the gateway for tokenization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub cvc: String,
    pub exp_month: String,
    pub exp_year: String,
    pub card_holder: String,
}

impl CardDetails {
    pub fn last_four(&self) -> &str {
        let start = self.number.len().saturating_sub(4);
        self.number.get(start..).unwrap_or_default()
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format_args!("****{}", self.last_four()))
            .field("cvc", &"***")
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("card_holder", &self.card_holder)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_number_and_cvc() {
        let card = CardDetails {
            number: "4242424242424242".to_string(),
            cvc: "123".to_string(),
            exp_month: "08".to_string(),
            exp_year: "28".to_string(),
            card_holder: "Ana Gomez".to_string(),
        };

        let rendered = format!("{:?}", card);
        assert!(rendered.contains("****4242"));
        assert!(!rendered.contains("4242424242424242"));
        assert!(!rendered.contains("123"));
    }
}
