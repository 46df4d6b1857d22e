//! Token storage seam.
//!
//! Persisting tokens is the embedding application's job; the core only reads
//! and writes through [`TokenStore`]. [`InMemoryTokenStore`] backs tests and
//! the command-line binary.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{ProviderKind, RefreshedToken, TokenResponse};

/// Errors that can occur during token storage operations.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Token backend error: {0}")]
    Backend(String),

    #[error("Token not found: {0}")]
    NotFound(String),
}

/// Result type for token storage operations.
pub type Result<T> = std::result::Result<T, TokenStoreError>;

/// Storage key for a provider's access token.
pub fn access_token_key(provider: ProviderKind) -> String {
    format!("oauth.access_token.{}", provider)
}

/// Storage key for a provider's refresh token.
pub fn refresh_token_key(provider: ProviderKind) -> String {
    format!("oauth.refresh_token.{}", provider)
}

/// Key/value store for opaque token strings.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores a value, overwriting any existing one.
    async fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Returns `None` if nothing is stored under `key`.
    async fn retrieve(&self, key: &str) -> Result<Option<String>>;

    /// Deletes a value. Returns [`TokenStoreError::NotFound`] if absent.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Current access token for a provider, if connected.
    async fn access_token(&self, provider: ProviderKind) -> Result<Option<String>> {
        self.retrieve(&access_token_key(provider)).await
    }

    /// Current refresh token for a provider, if one was issued.
    async fn refresh_token(&self, provider: ProviderKind) -> Result<Option<String>> {
        self.retrieve(&refresh_token_key(provider)).await
    }

    /// Saves the tokens from a code exchange.
    async fn save_exchange(&self, provider: ProviderKind, token: &TokenResponse) -> Result<()> {
        self.store(&access_token_key(provider), &token.access_token)
            .await?;
        if let Some(refresh) = &token.refresh_token {
            self.store(&refresh_token_key(provider), refresh).await?;
        }
        Ok(())
    }

    /// Saves the tokens from a refresh, keeping the old refresh token unless rotated.
    async fn save_refresh(&self, provider: ProviderKind, token: &RefreshedToken) -> Result<()> {
        self.store(&access_token_key(provider), &token.access_token)
            .await?;
        if let Some(refresh) = &token.refresh_token {
            self.store(&refresh_token_key(provider), refresh).await?;
        }
        Ok(())
    }

    /// Removes every token held for a provider.
    async fn disconnect(&self, provider: ProviderKind) -> Result<()> {
        for key in [access_token_key(provider), refresh_token_key(provider)] {
            match self.delete(&key).await {
                Ok(()) | Err(TokenStoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds access and refresh tokens from environment-style variables.
    ///
    /// Reads `{PREFIX}_{PROVIDER}_TOKEN` and `{PREFIX}_{PROVIDER}_REFRESH_TOKEN`
    /// through `lookup`, e.g. `UNIFIED_INBOX_GMAIL_TOKEN`. Empty values are
    /// ignored.
    pub fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut entries = HashMap::new();
        for provider in ProviderKind::ALL {
            let upper = provider.as_str().to_ascii_uppercase();
            let pairs = [
                (format!("{prefix}_{upper}_TOKEN"), access_token_key(provider)),
                (
                    format!("{prefix}_{upper}_REFRESH_TOKEN"),
                    refresh_token_key(provider),
                ),
            ];
            for (var, key) in pairs {
                if let Some(value) = lookup(&var).filter(|v| !v.trim().is_empty()) {
                    entries.insert(key, value);
                }
            }
        }
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn store(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| TokenStoreError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats() {
        assert_eq!(
            access_token_key(ProviderKind::Gmail),
            "oauth.access_token.gmail"
        );
        assert_eq!(
            refresh_token_key(ProviderKind::Outlook),
            "oauth.refresh_token.outlook"
        );
    }

    #[tokio::test]
    async fn store_retrieve_delete_cycle() {
        let store = InMemoryTokenStore::new();
        assert!(store.retrieve("k").await.unwrap().is_none());

        store.store("k", "v1").await.unwrap();
        store.store("k", "v2").await.unwrap();
        assert_eq!(store.retrieve("k").await.unwrap().as_deref(), Some("v2"));

        store.delete("k").await.unwrap();
        assert!(matches!(
            store.delete("k").await,
            Err(TokenStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_refresh_keeps_existing_refresh_token() {
        let store = InMemoryTokenStore::new();
        let exchanged = TokenResponse {
            access_token: "access-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_in_seconds: 3600,
            scope: String::new(),
            token_type: "Bearer".to_string(),
        };
        store
            .save_exchange(ProviderKind::Gmail, &exchanged)
            .await
            .unwrap();

        let refreshed = RefreshedToken {
            access_token: "access-2".to_string(),
            expires_in_seconds: 3600,
            refresh_token: None,
        };
        store
            .save_refresh(ProviderKind::Gmail, &refreshed)
            .await
            .unwrap();

        assert_eq!(
            store.access_token(ProviderKind::Gmail).await.unwrap().as_deref(),
            Some("access-2")
        );
        assert_eq!(
            store.refresh_token(ProviderKind::Gmail).await.unwrap().as_deref(),
            Some("refresh-1")
        );
    }

    #[tokio::test]
    async fn disconnect_tolerates_missing_entries() {
        let store = InMemoryTokenStore::new();
        store
            .store(&access_token_key(ProviderKind::Outlook), "token")
            .await
            .unwrap();

        store.disconnect(ProviderKind::Outlook).await.unwrap();
        store.disconnect(ProviderKind::Outlook).await.unwrap();
        assert!(store
            .access_token(ProviderKind::Outlook)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn from_lookup_reads_prefixed_variables() {
        let store = InMemoryTokenStore::from_lookup("APP", |name| match name {
            "APP_GMAIL_TOKEN" => Some("g-token".to_string()),
            "APP_OUTLOOK_TOKEN" => Some("   ".to_string()),
            "APP_OUTLOOK_REFRESH_TOKEN" => Some("o-refresh".to_string()),
            _ => None,
        });

        assert_eq!(
            store.access_token(ProviderKind::Gmail).await.unwrap().as_deref(),
            Some("g-token")
        );
        assert!(store
            .access_token(ProviderKind::Outlook)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            store
                .refresh_token(ProviderKind::Outlook)
                .await
                .unwrap()
                .as_deref(),
            Some("o-refresh")
        );
    }
}
