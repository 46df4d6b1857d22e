//! Gmail API provider implementation.
//!
//! This module provides a [`MailProvider`] implementation using the Gmail REST
//! API and Google's OAuth 2.0 endpoints.
//!
//! # API Usage
//!
//! - `users.messages.list` with `q=is:unread` for the unread listing
//! - `users.messages.get` with `format=full` for each message
//! - `users.messages.modify` to remove the `UNREAD` label
//!
//! Message bodies arrive base64url-encoded inside a MIME part tree; see
//! [`extract_body`] for how a single plain-text body is chosen.

use async_trait::async_trait;
use base64::prelude::*;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{http, oauth, MailProvider, PageSize, ProviderError, Result};
use crate::domain::{NormalizedMessage, ProviderKind, RefreshedToken, TokenResponse, UserProfile};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Scopes requested when the caller does not supply any.
pub const DEFAULT_GMAIL_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Gmail API message list response.
#[derive(Debug, Deserialize)]
struct MessageListResponse {
    messages: Option<Vec<MessageRef>>,
}

/// Message reference returned by the list call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    #[serde(default)]
    id: String,
    #[serde(default)]
    thread_id: String,
}

/// Gmail API message (`format=full`).
#[derive(Debug, Deserialize)]
struct GmailMessage {
    payload: Option<GmailPart>,
}

/// Gmail message part. The top-level payload uses the same shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    mime_type: Option<String>,
    headers: Option<Vec<GmailHeader>>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
}

/// Gmail message header.
#[derive(Debug, Deserialize)]
struct GmailHeader {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

/// Gmail message body.
#[derive(Debug, Deserialize)]
struct GmailBody {
    data: Option<String>,
}

/// Gmail modify request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyRequest {
    remove_label_ids: Vec<String>,
}

/// Google userinfo response.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    #[serde(default)]
    email: String,
    #[serde(default)]
    verified_email: bool,
    name: Option<String>,
}

/// Endpoints used by [`GmailProvider`]; overridable for tests and proxies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub user_info_url: String,
    /// Base of the `users/me` API, without trailing slash.
    pub api_base: String,
}

impl Default for GmailEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            user_info_url: GOOGLE_USER_INFO_URL.to_string(),
            api_base: GMAIL_API_BASE.to_string(),
        }
    }
}

/// Gmail API provider.
///
/// # Example
///
/// ```ignore
/// use unified_inbox::providers::email::{GmailProvider, MailProvider, PageSize};
///
/// let provider = GmailProvider::new();
/// let unread = provider.fetch_unread_messages(&access_token, PageSize::from(20)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GmailProvider {
    /// HTTP client for API requests.
    client: reqwest::Client,
    endpoints: GmailEndpoints,
}

impl GmailProvider {
    /// Creates a provider against Google's production endpoints.
    pub fn new() -> Self {
        Self::with_endpoints(reqwest::Client::new(), GmailEndpoints::default())
    }

    /// Creates a provider with an explicit HTTP client and endpoints.
    ///
    /// Timeouts and proxies are configured on the supplied client.
    pub fn with_endpoints(client: reqwest::Client, endpoints: GmailEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &GmailEndpoints {
        &self.endpoints
    }

    /// Fetches one message in full and normalizes it.
    async fn fetch_message(
        &self,
        access_token: &str,
        message_ref: &MessageRef,
    ) -> Result<NormalizedMessage> {
        let url = http::resource_url(
            &self.endpoints.api_base,
            &["messages", message_ref.id.as_str()],
        )?;
        let response = http::send(
            self.client
                .get(url)
                .bearer_auth(access_token)
                .query(&[("format", "full")]),
        )
        .await?;

        if !response.status().is_success() {
            let (status, description) = http::failure(response).await;
            return Err(ProviderError::FetchMessage {
                provider: ProviderKind::Gmail,
                message_id: message_ref.id.clone(),
                status,
                description,
            });
        }

        let message: GmailMessage = http::json(response).await?;
        Ok(normalize(message_ref, message))
    }
}

impl Default for GmailProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a Gmail message into the normalized shape.
fn normalize(message_ref: &MessageRef, message: GmailMessage) -> NormalizedMessage {
    let payload = message.payload.unwrap_or_default();
    let headers = payload.headers.as_deref().unwrap_or_default();

    NormalizedMessage::new(
        ProviderKind::Gmail,
        message_ref.id.clone(),
        message_ref.thread_id.clone(),
    )
    .with_from(header(headers, "From"))
    .with_to(header(headers, "To"))
    .with_subject(header(headers, "Subject"))
    .with_date(header(headers, "Date"))
    .with_body(extract_body(&payload))
}

/// Case-insensitive header lookup; empty when absent.
fn header<'a>(headers: &'a [GmailHeader], name: &str) -> &'a str {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
        .unwrap_or_default()
}

/// Decodes base64url data, tolerating padding and the standard alphabet.
fn decode_base64_url(data: &str) -> Option<String> {
    let normalized: String = data
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    BASE64_URL_SAFE_NO_PAD
        .decode(normalized)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Decoded, non-empty body data attached directly to a part.
fn direct_body(part: &GmailPart) -> Option<String> {
    part.body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .filter(|data| !data.is_empty())
        .and_then(decode_base64_url)
        .filter(|text| !text.is_empty())
}

/// Picks a plain body out of a part tree.
///
/// Direct data on `part` wins. Otherwise a `text/plain` child is preferred,
/// then the first nested part that yields anything. Returns an empty string
/// when nothing in the tree decodes.
fn extract_body(part: &GmailPart) -> String {
    if let Some(text) = direct_body(part) {
        return text;
    }

    let children = part.parts.as_deref().unwrap_or_default();

    let plain = children
        .iter()
        .filter(|child| child.mime_type.as_deref() == Some("text/plain"))
        .find_map(direct_body);
    if let Some(text) = plain {
        return text;
    }

    children
        .iter()
        .map(extract_body)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

#[async_trait]
impl MailProvider for GmailProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gmail
    }

    fn authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
        state: Option<&str>,
    ) -> Result<Url> {
        let scope = if scopes.is_empty() {
            DEFAULT_GMAIL_SCOPES.join(" ")
        } else {
            scopes.join(" ")
        };

        oauth::authorization_url(
            &self.endpoints.auth_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", &scope),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
            ],
            state,
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        let token: TokenResponse = oauth::request_token(
            &self.client,
            ProviderKind::Gmail,
            &self.endpoints.token_url,
            &[
                ("code", code),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ],
        )
        .await?;

        tracing::info!(
            provider = %ProviderKind::Gmail,
            has_refresh_token = token.refresh_token.is_some(),
            "Exchanged authorization code"
        );
        Ok(token)
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<RefreshedToken> {
        oauth::request_token(
            &self.client,
            ProviderKind::Gmail,
            &self.endpoints.token_url,
            &[
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
    }

    async fn user_info(&self, access_token: &str) -> Result<UserProfile> {
        let response = http::send(
            self.client
                .get(&self.endpoints.user_info_url)
                .bearer_auth(access_token),
        )
        .await?;

        if !response.status().is_success() {
            let (status, description) = http::failure(response).await;
            return Err(ProviderError::UserInfo {
                provider: ProviderKind::Gmail,
                status,
                description,
            });
        }

        let info: GoogleUserInfo = http::json(response).await?;
        Ok(UserProfile {
            email: info.email,
            display_name: info.name,
            verified: info.verified_email,
        })
    }

    async fn fetch_unread_messages(
        &self,
        access_token: &str,
        max_results: PageSize,
    ) -> Result<Vec<NormalizedMessage>> {
        let url = http::resource_url(&self.endpoints.api_base, &["messages"])?;
        let response = http::send(
            self.client
                .get(url)
                .bearer_auth(access_token)
                .query(&[("q", "is:unread".to_string()), ("maxResults", max_results.get().to_string())]),
        )
        .await?;

        if !response.status().is_success() {
            let (status, description) = http::failure(response).await;
            return Err(ProviderError::FetchList {
                provider: ProviderKind::Gmail,
                status,
                description,
            });
        }

        let list: MessageListResponse = http::json(response).await?;
        let refs: Vec<MessageRef> = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter(|r| !r.id.is_empty())
            .collect();

        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let outcomes = join_all(refs.iter().map(|r| self.fetch_message(access_token, r))).await;

        let requested = outcomes.len();
        let messages: Vec<NormalizedMessage> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::debug!(provider = %ProviderKind::Gmail, error = %e, "Dropping message");
                    None
                }
            })
            .collect();

        tracing::debug!(
            provider = %ProviderKind::Gmail,
            requested,
            fetched = messages.len(),
            "Fetched unread messages"
        );
        Ok(messages)
    }

    async fn mark_as_read(&self, access_token: &str, message_id: &str) -> Result<()> {
        let url = http::resource_url(
            &self.endpoints.api_base,
            &["messages", message_id, "modify"],
        )?;
        let body = ModifyRequest {
            remove_label_ids: vec!["UNREAD".to_string()],
        };

        let response =
            http::send(self.client.post(url).bearer_auth(access_token).json(&body)).await?;

        if !response.status().is_success() {
            let (status, description) = http::failure(response).await;
            return Err(ProviderError::MarkRead {
                provider: ProviderKind::Gmail,
                message_id: message_id.to_string(),
                status,
                description,
            });
        }
        Ok(())
    }
}
