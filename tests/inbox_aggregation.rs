//! Integration tests for inbox aggregation.
//!
//! These tests drive [`InboxService`] across module boundaries: first with
//! in-process fake providers, then end to end against mocked Gmail and Graph
//! HTTP APIs. Provider and service modules carry their own unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unified_inbox::domain::{
    NormalizedMessage, ProviderKind, RefreshedToken, TokenResponse, UserProfile,
};
use unified_inbox::providers::email::{
    GmailEndpoints, GmailProvider, MailProvider, OutlookEndpoints, OutlookProvider, PageSize,
    ProviderError, Result,
};
use unified_inbox::services::{InboxService, InboxState, ProviderTokens};
use unified_inbox::storage::{InMemoryTokenStore, TokenStore};

// ============================================================================
// Fake provider
// ============================================================================

/// Provider that serves canned messages and records calls.
struct FakeProvider {
    kind: ProviderKind,
    messages: Vec<NormalizedMessage>,
    fail: bool,
    fetch_calls: AtomicUsize,
    requested_page_sizes: Mutex<Vec<u32>>,
    marked: Mutex<Vec<(String, String)>>,
}

impl FakeProvider {
    fn new(kind: ProviderKind, ids: &[&str]) -> Self {
        Self {
            kind,
            messages: ids
                .iter()
                .map(|id| NormalizedMessage::new(kind, *id, format!("t-{id}")))
                .collect(),
            fail: false,
            fetch_calls: AtomicUsize::new(0),
            requested_page_sizes: Mutex::new(Vec::new()),
            marked: Mutex::new(Vec::new()),
        }
    }

    fn failing(kind: ProviderKind) -> Self {
        Self {
            fail: true,
            ..Self::new(kind, &[])
        }
    }

    fn calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn authorization_url(
        &self,
        _client_id: &str,
        _redirect_uri: &str,
        _scopes: &[String],
        _state: Option<&str>,
    ) -> Result<Url> {
        Err(ProviderError::Internal("not used".to_string()))
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _client_id: &str,
        _client_secret: &str,
        _redirect_uri: &str,
    ) -> Result<TokenResponse> {
        Err(ProviderError::Internal("not used".to_string()))
    }

    async fn refresh_token(
        &self,
        _refresh_token: &str,
        _client_id: &str,
        _client_secret: &str,
    ) -> Result<RefreshedToken> {
        Err(ProviderError::Internal("not used".to_string()))
    }

    async fn user_info(&self, _access_token: &str) -> Result<UserProfile> {
        Err(ProviderError::Internal("not used".to_string()))
    }

    async fn fetch_unread_messages(
        &self,
        _access_token: &str,
        max_results: PageSize,
    ) -> Result<Vec<NormalizedMessage>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_page_sizes
            .lock()
            .unwrap()
            .push(max_results.get());
        if self.fail {
            return Err(ProviderError::FetchList {
                provider: self.kind,
                status: 401,
                description: Some("Invalid Credentials".to_string()),
            });
        }
        Ok(self.messages.clone())
    }

    async fn mark_as_read(&self, access_token: &str, message_id: &str) -> Result<()> {
        self.marked
            .lock()
            .unwrap()
            .push((access_token.to_string(), message_id.to_string()));
        Ok(())
    }
}

fn service(gmail: &Arc<FakeProvider>, outlook: &Arc<FakeProvider>) -> InboxService {
    InboxService::new(gmail.clone(), outlook.clone())
}

fn ids(messages: &[NormalizedMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.id()).collect()
}

fn tokens(gmail: Option<&str>, outlook: Option<&str>) -> ProviderTokens {
    ProviderTokens::new(gmail.map(str::to_string), outlook.map(str::to_string))
}

// ============================================================================
// Aggregation with fake providers
// ============================================================================

#[tokio::test]
async fn no_tokens_makes_no_calls() {
    let gmail = Arc::new(FakeProvider::new(ProviderKind::Gmail, &["g1"]));
    let outlook = Arc::new(FakeProvider::new(ProviderKind::Outlook, &["o1"]));

    let feed = service(&gmail, &outlook).aggregate(&tokens(None, None)).await;

    assert!(feed.is_empty());
    assert!(feed.is_complete());
    assert_eq!(gmail.calls(), 0);
    assert_eq!(outlook.calls(), 0);
}

#[tokio::test]
async fn empty_token_counts_as_disconnected() {
    let gmail = Arc::new(FakeProvider::new(ProviderKind::Gmail, &["g1"]));
    let outlook = Arc::new(FakeProvider::new(ProviderKind::Outlook, &["o1"]));

    let feed = service(&gmail, &outlook)
        .aggregate(&tokens(Some(""), Some("outlook-token")))
        .await;

    assert_eq!(ids(&feed.messages), vec!["o1"]);
    assert_eq!(gmail.calls(), 0);
    assert_eq!(outlook.calls(), 1);
}

#[tokio::test]
async fn merges_and_orders_by_descending_id() {
    let gmail = Arc::new(FakeProvider::new(ProviderKind::Gmail, &["g1", "g5"]));
    let outlook = Arc::new(FakeProvider::new(ProviderKind::Outlook, &["o2", "o9"]));

    let feed = service(&gmail, &outlook)
        .aggregate(&tokens(Some("g"), Some("o")))
        .await;

    assert_eq!(ids(&feed.messages), vec!["o9", "o2", "g5", "g1"]);
    assert!(feed.is_complete());
}

#[tokio::test]
async fn one_provider_failing_keeps_the_other() {
    let gmail = Arc::new(FakeProvider::failing(ProviderKind::Gmail));
    let outlook = Arc::new(FakeProvider::new(ProviderKind::Outlook, &["o1", "o2"]));

    let feed = service(&gmail, &outlook)
        .aggregate(&tokens(Some("expired"), Some("o")))
        .await;

    assert_eq!(ids(&feed.messages), vec!["o2", "o1"]);
    assert_eq!(feed.failures.len(), 1);
    assert_eq!(feed.failures[0].provider, ProviderKind::Gmail);
    assert_eq!(feed.failures[0].error.status(), Some(401));
}

#[tokio::test]
async fn both_providers_failing_yields_empty_feed() {
    let gmail = Arc::new(FakeProvider::failing(ProviderKind::Gmail));
    let outlook = Arc::new(FakeProvider::failing(ProviderKind::Outlook));

    let feed = service(&gmail, &outlook)
        .aggregate(&tokens(Some("g"), Some("o")))
        .await;

    assert!(feed.is_empty());
    assert_eq!(feed.failures.len(), 2);
}

#[tokio::test]
async fn page_size_is_forwarded_clamped() {
    let gmail = Arc::new(FakeProvider::new(ProviderKind::Gmail, &[]));
    let outlook = Arc::new(FakeProvider::new(ProviderKind::Outlook, &[]));

    service(&gmail, &outlook)
        .with_page_size(PageSize::from(1000_u32))
        .aggregate(&tokens(Some("g"), Some("o")))
        .await;

    assert_eq!(*gmail.requested_page_sizes.lock().unwrap(), vec![100]);
    assert_eq!(*outlook.requested_page_sizes.lock().unwrap(), vec![100]);
}

#[tokio::test]
async fn mark_as_read_routes_to_owning_provider() {
    let gmail = Arc::new(FakeProvider::new(ProviderKind::Gmail, &[]));
    let outlook = Arc::new(FakeProvider::new(ProviderKind::Outlook, &[]));
    let service = service(&gmail, &outlook);
    let message = NormalizedMessage::new(ProviderKind::Outlook, "AAMk1", "conv");

    service
        .mark_as_read(&tokens(Some("g"), Some("o-token")), &message)
        .await
        .unwrap();

    assert!(gmail.marked.lock().unwrap().is_empty());
    assert_eq!(
        *outlook.marked.lock().unwrap(),
        vec![("o-token".to_string(), "AAMk1".to_string())]
    );
}

#[tokio::test]
async fn mark_as_read_requires_connection() {
    let gmail = Arc::new(FakeProvider::new(ProviderKind::Gmail, &[]));
    let outlook = Arc::new(FakeProvider::new(ProviderKind::Outlook, &[]));
    let message = NormalizedMessage::new(ProviderKind::Gmail, "g1", "t1");

    let err = service(&gmail, &outlook)
        .mark_as_read(&tokens(None, Some("o")), &message)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::InvalidRequest(_)));
    assert!(gmail.marked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn tokens_load_from_store_and_drive_state() {
    let store = InMemoryTokenStore::from_lookup("TEST", |name| match name {
        "TEST_OUTLOOK_TOKEN" => Some("o-token".to_string()),
        _ => None,
    });
    let loaded = ProviderTokens::load(&store).await.unwrap();
    assert_eq!(loaded, tokens(None, Some("o-token")));

    let gmail = Arc::new(FakeProvider::new(ProviderKind::Gmail, &["g1"]));
    let outlook = Arc::new(FakeProvider::new(ProviderKind::Outlook, &["o1"]));
    let mut state = InboxState::from_tokens(&loaded);

    state.begin_refresh(&loaded);
    assert!(state.status(ProviderKind::Outlook).loading);
    assert!(!state.status(ProviderKind::Gmail).loading);

    let feed = service(&gmail, &outlook).aggregate(&loaded).await;
    let failures = state.finish_refresh(feed);

    assert!(failures.is_empty());
    assert!(!state.is_loading());
    assert_eq!(ids(state.messages()), vec!["o1"]);

    store.disconnect(ProviderKind::Outlook).await.unwrap();
    assert!(ProviderTokens::load(&store).await.unwrap().is_empty());
}

// ============================================================================
// End to end against mocked HTTP APIs
// ============================================================================

async fn mount_gmail(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/gmail/messages"))
        .and(query_param("q", "is:unread"))
        .and(query_param("maxResults", "5"))
        .and(header("authorization", "Bearer gmail-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [
                {"id": "18c2a", "threadId": "t1"},
                {"id": "18c2b", "threadId": "t2"}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gmail/messages/18c2a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "18c2a",
            "threadId": "t1",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "From", "value": "alice@example.com"},
                    {"name": "To", "value": "me@example.com"},
                    {"name": "Subject", "value": "Lunch?"},
                    {"name": "Date", "value": "Mon, 1 Jan 2024 10:00:00 +0000"}
                ],
                "body": {"data": "SGVsbG8"}
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gmail/messages/18c2b"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": 404, "message": "Requested entity was not found."}
        })))
        .mount(server)
        .await;
}

async fn mount_outlook(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/graph/mailFolders/inbox/messages"))
        .and(query_param("$filter", "isRead eq false"))
        .and(query_param("$top", "5"))
        .and(header("authorization", "Bearer outlook-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{
                "id": "AAMkAD",
                "conversationId": "conv-1",
                "subject": "Quarterly report",
                "from": {"emailAddress": {"address": "bob@contoso.com"}},
                "toRecipients": [{"emailAddress": {"address": "me@contoso.com"}}],
                "body": {"content": "<p>Attached</p>"},
                "receivedDateTime": "2024-01-02T09:30:00Z"
            }]
        })))
        .mount(server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/graph/messages/AAMkAD"))
        .and(body_json(serde_json::json!({"isRead": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(server)
        .await;
}

fn http_service(server: &MockServer) -> InboxService {
    let client = reqwest::Client::new();
    let gmail = GmailProvider::with_endpoints(
        client.clone(),
        GmailEndpoints {
            api_base: format!("{}/gmail", server.uri()),
            ..GmailEndpoints::default()
        },
    );
    let outlook = OutlookProvider::with_endpoints(
        client,
        OutlookEndpoints {
            api_base: format!("{}/graph", server.uri()),
            ..OutlookEndpoints::default()
        },
    );
    InboxService::new(Arc::new(gmail), Arc::new(outlook)).with_page_size(PageSize::from(5_u32))
}

#[tokio::test]
async fn aggregates_real_providers_over_http() {
    let server = MockServer::start().await;
    mount_gmail(&server).await;
    mount_outlook(&server).await;
    let service = http_service(&server);
    let tokens = tokens(Some("gmail-token"), Some("outlook-token"));

    let feed = service.aggregate(&tokens).await;

    // 18c2b failed individually and is dropped without failing Gmail.
    assert!(feed.is_complete());
    assert_eq!(ids(&feed.messages), vec!["AAMkAD", "18c2a"]);

    let gmail = &feed.messages[1];
    assert_eq!(gmail.provider(), ProviderKind::Gmail);
    assert_eq!(gmail.thread_or_conversation_id(), "t1");
    assert_eq!(gmail.from(), "alice@example.com");
    assert_eq!(gmail.subject(), "Lunch?");
    assert_eq!(gmail.body(), "Hello");

    let outlook = &feed.messages[0];
    assert_eq!(outlook.provider(), ProviderKind::Outlook);
    assert_eq!(outlook.to(), "me@contoso.com");
    assert_eq!(outlook.date(), "2024-01-02T09:30:00Z");

    service.mark_as_read(&tokens, outlook).await.unwrap();
}

#[tokio::test]
async fn rejected_token_is_reported_per_provider() {
    let server = MockServer::start().await;
    mount_outlook(&server).await;
    Mock::given(method("GET"))
        .and(path("/gmail/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"code": 401, "message": "Invalid Credentials"}
        })))
        .mount(&server)
        .await;
    let service = http_service(&server);

    let feed = service
        .aggregate(&tokens(Some("stale"), Some("outlook-token")))
        .await;

    assert_eq!(ids(&feed.messages), vec!["AAMkAD"]);
    assert_eq!(feed.failures.len(), 1);
    let failure = &feed.failures[0];
    assert_eq!(failure.provider, ProviderKind::Gmail);
    assert_eq!(failure.error.status(), Some(401));
    assert_eq!(failure.error.description(), Some("Invalid Credentials"));
}
