use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMappings {
    #[serde(default = "default_subject_claim")]
    pub subject_claim: String,
    #[serde(default)]
    pub groups_claim: Option<String>,
}

fn default_subject_claim() -> String {
    "sub".to_string()
}

impl Default for ClaimMappings {
    fn default() -> Self {
        Self {
            subject_claim: default_subject_claim(),
            groups_claim: None,
        }
    }
}

/// An upstream token issuer trusted for credential exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIssuerConfig {
    pub issuer: String,
    pub audiences: Vec<String>,
    #[serde(default)]
    pub discovery_url: Option<String>,
    #[serde(default)]
    pub jwks_url: Option<String>,
    #[serde(default)]
    pub claim_mappings: ClaimMappings,
}
