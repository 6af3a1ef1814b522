use serde::{Deserialize, Serialize};
use std::fmt;

/// The two legal consents the gateway requires on every charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcceptanceKind {
    EndUserPolicy,
    PersonalDataAuth,
}

impl AcceptanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptanceKind::EndUserPolicy => "END_USER_POLICY",
            AcceptanceKind::PersonalDataAuth => "PERSONAL_DATA_AUTH",
        }
    }
}

impl fmt::Display for AcceptanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A presigned acceptance contract as issued by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    pub acceptance_token: String,
    pub permalink: String,
    #[serde(rename = "type")]
    pub kind: AcceptanceKind,
}

/// Both acceptances, fetched fresh for every order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalAcceptances {
    pub end_user_policy: Acceptance,
    pub personal_data_auth: Acceptance,
}
