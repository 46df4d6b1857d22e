//! Mail provider trait definition.
//!
//! This module defines the [`MailProvider`] trait implemented by the Gmail and
//! Outlook clients, the [`ProviderError`] taxonomy they share, and the
//! [`PageSize`] bound applied to unread listings.

use async_trait::async_trait;
use url::Url;

use crate::domain::{NormalizedMessage, ProviderKind, RefreshedToken, TokenResponse, UserProfile};

/// Result type alias for mail provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during mail provider operations.
///
/// Status-bearing variants carry the HTTP status returned by the provider and,
/// when the error body could be parsed, the provider's own description.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authorization-code or refresh-token exchange was rejected.
    #[error("{provider} token exchange failed (status: {status}){}", suffix(.description))]
    AuthExchange {
        provider: ProviderKind,
        status: u16,
        description: Option<String>,
    },

    /// Listing unread message identifiers failed.
    #[error("{provider} unread listing failed (status: {status}){}", suffix(.description))]
    FetchList {
        provider: ProviderKind,
        status: u16,
        description: Option<String>,
    },

    /// Fetching a single message's content failed.
    #[error("{provider} message {message_id} fetch failed (status: {status}){}", suffix(.description))]
    FetchMessage {
        provider: ProviderKind,
        message_id: String,
        status: u16,
        description: Option<String>,
    },

    /// Marking a message as read failed.
    #[error("{provider} message {message_id} mark-as-read failed (status: {status}){}", suffix(.description))]
    MarkRead {
        provider: ProviderKind,
        message_id: String,
        status: u16,
        description: Option<String>,
    },

    /// Looking up the signed-in user's profile failed.
    #[error("{provider} user info lookup failed (status: {status}){}", suffix(.description))]
    UserInfo {
        provider: ProviderKind,
        status: u16,
        description: Option<String>,
    },

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Response body could not be decoded.
    #[error("internal error: {0}")]
    Internal(String),
}

fn suffix(description: &Option<String>) -> String {
    match description {
        Some(text) => format!(": {text}"),
        None => String::new(),
    }
}

impl ProviderError {
    /// HTTP status reported by the provider, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthExchange { status, .. }
            | Self::FetchList { status, .. }
            | Self::FetchMessage { status, .. }
            | Self::MarkRead { status, .. }
            | Self::UserInfo { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Provider-supplied error description, if one was parsed.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::AuthExchange { description, .. }
            | Self::FetchList { description, .. }
            | Self::FetchMessage { description, .. }
            | Self::MarkRead { description, .. }
            | Self::UserInfo { description, .. } => description.as_deref(),
            _ => None,
        }
    }
}

/// Upper bound on messages requested from a provider in one listing.
///
/// Any requested value is truncated toward zero and clamped to
/// `[PageSize::MIN, PageSize::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSize(u32);

impl PageSize {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;
    pub const DEFAULT: u32 = 10;

    /// Clamps an arbitrary, possibly fractional request. NaN maps to the minimum.
    pub fn clamped(requested: f64) -> Self {
        if requested.is_nan() {
            return Self(Self::MIN);
        }
        let bounded = requested.trunc().clamp(f64::from(Self::MIN), f64::from(Self::MAX));
        Self(bounded as u32)
    }

    /// The effective bound sent to the provider.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl From<f64> for PageSize {
    fn from(value: f64) -> Self {
        Self::clamped(value)
    }
}

impl From<i64> for PageSize {
    fn from(value: i64) -> Self {
        Self(value.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u32)
    }
}

impl From<i32> for PageSize {
    fn from(value: i32) -> Self {
        Self::from(i64::from(value))
    }
}

impl From<u32> for PageSize {
    fn from(value: u32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }
}

impl From<usize> for PageSize {
    fn from(value: usize) -> Self {
        Self(value.clamp(Self::MIN as usize, Self::MAX as usize) as u32)
    }
}

/// Trait for mail provider clients.
///
/// Implementations are stateless request/response clients: tokens and OAuth
/// client credentials are passed in on every call and never retained.
///
/// # Example
///
/// ```ignore
/// use unified_inbox::providers::email::{MailProvider, PageSize};
///
/// async fn unread_subjects(provider: &dyn MailProvider, token: &str) -> Vec<String> {
///     provider
///         .fetch_unread_messages(token, PageSize::from(25))
///         .await
///         .map(|messages| messages.iter().map(|m| m.subject().to_string()).collect())
///         .unwrap_or_default()
/// }
/// ```
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Returns which provider this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Builds the URL the user visits to grant access.
    ///
    /// Pure construction with no network call. An empty `scopes` slice selects
    /// the provider's default scopes.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidRequest`] if the configured authorization
    /// endpoint is not a valid URL.
    fn authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
        state: Option<&str>,
    ) -> Result<Url>;

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::AuthExchange`] on any non-success response.
    async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse>;

    /// Obtains a new access token from a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::AuthExchange`] on any non-success response.
    async fn refresh_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<RefreshedToken>;

    /// Looks up the profile of the mailbox owner.
    async fn user_info(&self, access_token: &str) -> Result<UserProfile>;

    /// Fetches up to `max_results` unread messages.
    ///
    /// Messages whose individual fetch fails are left out of the result
    /// instead of failing the call.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::FetchList`] if the unread listing itself fails.
    async fn fetch_unread_messages(
        &self,
        access_token: &str,
        max_results: PageSize,
    ) -> Result<Vec<NormalizedMessage>>;

    /// Marks a single message as read.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MarkRead`] on any non-success response.
    async fn mark_as_read(&self, access_token: &str, message_id: &str) -> Result<()>;
}
