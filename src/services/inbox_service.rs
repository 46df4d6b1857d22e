//! Inbox service for multi-provider aggregation.
//!
//! The [`InboxService`] fetches unread messages from every connected provider
//! concurrently and merges them into one ordered feed. It holds no session
//! state: tokens are passed in on every call, and the connected/loading flags
//! the UI renders live in a caller-owned [`InboxState`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{NormalizedMessage, ProviderKind};
use crate::providers::email::{MailProvider, PageSize, ProviderError};
use crate::storage::{self, TokenStore};

/// Access tokens for each provider; `None` means not connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderTokens {
    pub gmail: Option<String>,
    pub outlook: Option<String>,
}

impl ProviderTokens {
    pub fn new(gmail: Option<String>, outlook: Option<String>) -> Self {
        Self { gmail, outlook }
    }

    /// Loads current access tokens from a token store.
    pub async fn load(store: &dyn TokenStore) -> storage::Result<Self> {
        Ok(Self {
            gmail: store.access_token(ProviderKind::Gmail).await?,
            outlook: store.access_token(ProviderKind::Outlook).await?,
        })
    }

    /// Token for `provider`, ignoring empty strings.
    pub fn get(&self, provider: ProviderKind) -> Option<&str> {
        let token = match provider {
            ProviderKind::Gmail => self.gmail.as_deref(),
            ProviderKind::Outlook => self.outlook.as_deref(),
        };
        token.filter(|t| !t.is_empty())
    }

    pub fn is_connected(&self, provider: ProviderKind) -> bool {
        self.get(provider).is_some()
    }

    /// True when no provider is connected.
    pub fn is_empty(&self) -> bool {
        ProviderKind::ALL.iter().all(|p| !self.is_connected(*p))
    }
}

/// A provider whose whole fetch failed during aggregation.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub error: ProviderError,
}

/// Result of one aggregation pass.
#[derive(Debug, Default)]
pub struct InboxFeed {
    /// Merged messages, ordered by [`sort_by_id_desc`].
    pub messages: Vec<NormalizedMessage>,
    /// Providers that could not be fetched. Their absence from `messages`
    /// is the only other trace of the failure.
    pub failures: Vec<ProviderFailure>,
}

impl InboxFeed {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True when every requested provider answered.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Aggregates unread mail across Gmail and Outlook.
///
/// # Example
///
/// ```ignore
/// let service = InboxService::new(Arc::new(GmailProvider::new()), Arc::new(OutlookProvider::new()));
/// let feed = service.aggregate(&ProviderTokens::new(Some(gmail_token), None)).await;
/// for message in &feed.messages {
///     println!("[{}] {}", message.provider(), message.subject());
/// }
/// ```
pub struct InboxService {
    gmail: Arc<dyn MailProvider>,
    outlook: Arc<dyn MailProvider>,
    page_size: PageSize,
}

impl InboxService {
    /// Creates a service with the default page size.
    pub fn new(gmail: Arc<dyn MailProvider>, outlook: Arc<dyn MailProvider>) -> Self {
        Self {
            gmail,
            outlook,
            page_size: PageSize::default(),
        }
    }

    /// Sets how many unread messages to request from each provider.
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Client for `provider`.
    pub fn provider(&self, provider: ProviderKind) -> &dyn MailProvider {
        match provider {
            ProviderKind::Gmail => self.gmail.as_ref(),
            ProviderKind::Outlook => self.outlook.as_ref(),
        }
    }

    /// Fetches and merges unread messages from every connected provider.
    ///
    /// With no tokens this returns an empty feed without any network call.
    /// Provider fetches run concurrently; a provider that fails entirely is
    /// recorded in [`InboxFeed::failures`] and the others are still merged.
    pub async fn aggregate(&self, tokens: &ProviderTokens) -> InboxFeed {
        if tokens.is_empty() {
            return InboxFeed::default();
        }

        let (gmail, outlook) = futures::join!(
            self.fetch_from(ProviderKind::Gmail, tokens.get(ProviderKind::Gmail)),
            self.fetch_from(ProviderKind::Outlook, tokens.get(ProviderKind::Outlook)),
        );

        let mut batches = Vec::with_capacity(2);
        let mut failures = Vec::new();
        for (provider, outcome) in [(ProviderKind::Gmail, gmail), (ProviderKind::Outlook, outlook)] {
            match outcome {
                None => {}
                Some(Ok(messages)) => batches.push(messages),
                Some(Err(error)) => {
                    tracing::warn!(provider = %provider, error = %error, "Failed to fetch inbox");
                    failures.push(ProviderFailure { provider, error });
                }
            }
        }

        let messages = merge_messages(batches);
        tracing::info!(
            messages = messages.len(),
            failed_providers = failures.len(),
            "Aggregated inbox"
        );
        InboxFeed { messages, failures }
    }

    /// Marks one message as read at the provider that owns it.
    pub async fn mark_as_read(
        &self,
        tokens: &ProviderTokens,
        message: &NormalizedMessage,
    ) -> crate::providers::email::Result<()> {
        let provider = message.provider();
        let token = tokens.get(provider).ok_or_else(|| {
            ProviderError::InvalidRequest(format!("{} is not connected", provider))
        })?;
        self.provider(provider).mark_as_read(token, message.id()).await
    }

    async fn fetch_from(
        &self,
        provider: ProviderKind,
        token: Option<&str>,
    ) -> Option<crate::providers::email::Result<Vec<NormalizedMessage>>> {
        let token = token?;
        Some(
            self.provider(provider)
                .fetch_unread_messages(token, self.page_size)
                .await,
        )
    }
}

/// Concatenates provider batches and orders them with [`sort_by_id_desc`].
pub fn merge_messages(
    batches: impl IntoIterator<Item = Vec<NormalizedMessage>>,
) -> Vec<NormalizedMessage> {
    let mut merged: Vec<NormalizedMessage> = batches.into_iter().flatten().collect();
    sort_by_id_desc(&mut merged);
    merged
}

/// Sorts messages by ID, descending, comparing IDs as plain strings.
///
/// ID order stands in for recency. That holds within one provider's ID
/// scheme but not across providers, whose IDs have unrelated formats.
/// The sort is stable, so equal IDs keep their batch order.
pub fn sort_by_id_desc(messages: &mut [NormalizedMessage]) {
    messages.sort_by(|a, b| b.id().cmp(a.id()));
}

/// Sorts messages newest first by parsed date.
///
/// Empty or unparseable dates sort as oldest; ties fall back to ID order.
pub fn sort_by_date_desc(messages: &mut [NormalizedMessage]) {
    messages.sort_by(|a, b| {
        b.timestamp()
            .cmp(&a.timestamp())
            .then_with(|| b.id().cmp(a.id()))
    });
}

/// Connection and loading flags for one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// A token is present.
    pub connected: bool,
    /// A fetch is in flight.
    pub loading: bool,
}

/// View model owned by the caller that renders the inbox.
#[derive(Debug, Clone, Default)]
pub struct InboxState {
    gmail: ProviderStatus,
    outlook: ProviderStatus,
    messages: Vec<NormalizedMessage>,
}

impl InboxState {
    /// Derives connection flags from the given tokens.
    pub fn from_tokens(tokens: &ProviderTokens) -> Self {
        let mut state = Self::default();
        state.sync_connections(tokens);
        state
    }

    pub fn status(&self, provider: ProviderKind) -> ProviderStatus {
        match provider {
            ProviderKind::Gmail => self.gmail,
            ProviderKind::Outlook => self.outlook,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.gmail.loading || self.outlook.loading
    }

    pub fn messages(&self) -> &[NormalizedMessage] {
        &self.messages
    }

    /// Marks every connected provider as loading.
    pub fn begin_refresh(&mut self, tokens: &ProviderTokens) {
        self.sync_connections(tokens);
        self.gmail.loading = self.gmail.connected;
        self.outlook.loading = self.outlook.connected;
    }

    /// Stores the merged feed, clears loading flags, and hands back failures.
    pub fn finish_refresh(&mut self, feed: InboxFeed) -> Vec<ProviderFailure> {
        self.gmail.loading = false;
        self.outlook.loading = false;
        self.messages = feed.messages;
        feed.failures
    }

    /// Drops both connections and the cached feed.
    pub fn disconnect_all(&mut self) {
        *self = Self::default();
    }

    fn sync_connections(&mut self, tokens: &ProviderTokens) {
        self.gmail.connected = tokens.is_connected(ProviderKind::Gmail);
        self.outlook.connected = tokens.is_connected(ProviderKind::Outlook);
        if !self.gmail.connected && !self.outlook.connected {
            self.messages.clear();
        }
    }
}
