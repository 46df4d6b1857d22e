//! OAuth token and profile types returned by the identity providers.

use serde::{Deserialize, Serialize};

/// Result of exchanging an authorization code.
///
/// Field names follow the OAuth 2.0 token endpoint response so the type can
/// be deserialized straight off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Long-lived token for obtaining new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token.
    #[serde(rename = "expires_in", default)]
    pub expires_in_seconds: u64,
    /// Space-separated scopes actually granted.
    #[serde(default)]
    pub scope: String,
    /// Usually `Bearer`.
    #[serde(default)]
    pub token_type: String,
}

/// Result of a refresh-token grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    #[serde(rename = "expires_in", default)]
    pub expires_in_seconds: u64,
    /// Present only when the provider rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Basic profile of the signed-in mailbox owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Primary email address.
    pub email: String,
    /// Display name, when the provider reports one.
    pub display_name: Option<String>,
    /// Whether the provider vouches for the address.
    pub verified: bool,
}
