//! Outlook (Microsoft Graph) provider implementation.
//!
//! Authorization runs against the Microsoft identity platform v2.0 `common`
//! tenant; mail is read from the Graph `me/mailFolders/inbox/messages`
//! collection. Graph already returns structured fields, so normalization is a
//! field mapping with empty-string defaults.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{http, oauth, MailProvider, PageSize, ProviderError, Result};
use crate::domain::{NormalizedMessage, ProviderKind, RefreshedToken, TokenResponse, UserProfile};

const OUTLOOK_AUTH_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
const OUTLOOK_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0/me";

/// Scopes requested when the caller does not supply any.
pub const DEFAULT_OUTLOOK_SCOPES: [&str; 7] = [
    "openid",
    "profile",
    "email",
    "offline_access",
    "Mail.Send",
    "Mail.Read",
    "User.Read",
];

const MESSAGE_SELECT: &str = "id,conversationId,from,toRecipients,subject,body,receivedDateTime";

/// Graph message collection page.
#[derive(Debug, Deserialize)]
struct GraphMessagesPage {
    value: Option<Vec<GraphMessage>>,
}

/// Graph message, restricted to the selected fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    id: Option<String>,
    conversation_id: Option<String>,
    received_date_time: Option<String>,
    subject: Option<String>,
    body: Option<GraphBody>,
    from: Option<GraphRecipient>,
    to_recipients: Option<Vec<GraphRecipient>>,
}

#[derive(Debug, Deserialize)]
struct GraphBody {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecipient {
    email_address: Option<GraphEmailAddress>,
}

impl GraphRecipient {
    fn address(&self) -> Option<&str> {
        self.email_address.as_ref()?.address.as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    address: Option<String>,
}

/// Graph `PATCH /messages/{id}` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadFlagUpdate {
    is_read: bool,
}

/// Graph `GET /me` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    mail: Option<String>,
    user_principal_name: Option<String>,
    display_name: Option<String>,
}

/// Endpoints used by [`OutlookProvider`]; overridable for tests and
/// single-tenant deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlookEndpoints {
    pub auth_url: String,
    pub token_url: String,
    /// Base of the Graph `me` resource, without trailing slash.
    pub api_base: String,
}

impl Default for OutlookEndpoints {
    fn default() -> Self {
        Self {
            auth_url: OUTLOOK_AUTH_URL.to_string(),
            token_url: OUTLOOK_TOKEN_URL.to_string(),
            api_base: GRAPH_API_BASE.to_string(),
        }
    }
}

/// Microsoft Graph mail provider.
#[derive(Debug, Clone)]
pub struct OutlookProvider {
    client: reqwest::Client,
    endpoints: OutlookEndpoints,
    /// Scopes re-sent on refresh. Empty selects the defaults.
    scopes: Vec<String>,
}

impl OutlookProvider {
    /// Creates a provider against Microsoft's production endpoints.
    pub fn new() -> Self {
        Self::with_endpoints(reqwest::Client::new(), OutlookEndpoints::default())
    }

    /// Creates a provider with an explicit HTTP client and endpoints.
    pub fn with_endpoints(client: reqwest::Client, endpoints: OutlookEndpoints) -> Self {
        Self {
            client,
            endpoints,
            scopes: Vec::new(),
        }
    }

    /// Sets the scopes the user was asked to consent to.
    ///
    /// The v2.0 token endpoint rejects a refresh that asks for scopes beyond
    /// the original grant, so this must match what `authorization_url` used.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn endpoints(&self) -> &OutlookEndpoints {
        &self.endpoints
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

impl Default for OutlookProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a Graph message into the normalized shape.
///
/// Messages without an ID cannot be addressed later and are skipped.
fn normalize(message: GraphMessage) -> Option<NormalizedMessage> {
    let id = message.id.filter(|id| !id.is_empty())?;

    let from = message
        .from
        .as_ref()
        .and_then(GraphRecipient::address)
        .unwrap_or_default()
        .to_string();
    let to = message
        .to_recipients
        .as_ref()
        .and_then(|recipients| recipients.first())
        .and_then(GraphRecipient::address)
        .unwrap_or_default()
        .to_string();

    Some(
        NormalizedMessage::new(
            ProviderKind::Outlook,
            id,
            message.conversation_id.unwrap_or_default(),
        )
        .with_from(from)
        .with_to(to)
        .with_subject(message.subject.unwrap_or_default())
        .with_body(message.body.and_then(|b| b.content).unwrap_or_default())
        .with_date(message.received_date_time.unwrap_or_default()),
    )
}

fn scope_string(scopes: &[String]) -> String {
    if scopes.is_empty() {
        DEFAULT_OUTLOOK_SCOPES.join(" ")
    } else {
        scopes.join(" ")
    }
}

#[async_trait]
impl MailProvider for OutlookProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Outlook
    }

    fn authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
        state: Option<&str>,
    ) -> Result<Url> {
        let scope = scope_string(scopes);
        oauth::authorization_url(
            &self.endpoints.auth_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", &scope),
                ("response_mode", "query"),
                ("prompt", "consent"),
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
            ProviderKind::Outlook,
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
            provider = %ProviderKind::Outlook,
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
        // The v2.0 endpoint requires the scope list again on refresh.
        let scope = scope_string(&self.scopes);
        oauth::request_token(
            &self.client,
            ProviderKind::Outlook,
            &self.endpoints.token_url,
            &[
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "refresh_token"),
                ("scope", &scope),
            ],
        )
        .await
    }

    async fn user_info(&self, access_token: &str) -> Result<UserProfile> {
        let response = http::send(
            self.client
                .get(&self.endpoints.api_base)
                .bearer_auth(access_token),
        )
        .await?;

        if !response.status().is_success() {
            let (status, description) = http::failure(response).await;
            return Err(ProviderError::UserInfo {
                provider: ProviderKind::Outlook,
                status,
                description,
            });
        }

        let user: GraphUser = http::json(response).await?;
        Ok(UserProfile {
            email: user.mail.or(user.user_principal_name).unwrap_or_default(),
            display_name: user.display_name,
            verified: true,
        })
    }

    async fn fetch_unread_messages(
        &self,
        access_token: &str,
        max_results: PageSize,
    ) -> Result<Vec<NormalizedMessage>> {
        let url = http::resource_url(
            &self.endpoints.api_base,
            &["mailFolders", "inbox", "messages"],
        )?;
        let top = max_results.get().to_string();
        let response = http::send(
            self.client
                .get(url)
                .bearer_auth(access_token)
                .query(&[
                    ("$filter", "isRead eq false"),
                    ("$top", top.as_str()),
                    ("$select", MESSAGE_SELECT),
                ]),
        )
        .await?;

        if !response.status().is_success() {
            let (status, description) = http::failure(response).await;
            return Err(ProviderError::FetchList {
                provider: ProviderKind::Outlook,
                status,
                description,
            });
        }

        let page: GraphMessagesPage = http::json(response).await?;
        let messages: Vec<NormalizedMessage> = page
            .value
            .unwrap_or_default()
            .into_iter()
            .filter_map(normalize)
            .collect();

        tracing::debug!(
            provider = %ProviderKind::Outlook,
            fetched = messages.len(),
            "Fetched unread messages"
        );
        Ok(messages)
    }

    async fn mark_as_read(&self, access_token: &str, message_id: &str) -> Result<()> {
        let url = http::resource_url(&self.endpoints.api_base, &["messages", message_id])?;
        let response = http::send(
            self.client
                .patch(url)
                .bearer_auth(access_token)
                .json(&ReadFlagUpdate { is_read: true }),
        )
        .await?;

        if !response.status().is_success() {
            let (status, description) = http::failure(response).await;
            return Err(ProviderError::MarkRead {
                provider: ProviderKind::Outlook,
                message_id: message_id.to_string(),
                status,
                description,
            });
        }
        Ok(())
    }
}
