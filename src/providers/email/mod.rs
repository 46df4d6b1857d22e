//! Mail provider implementations.
//!
//! This module contains the [`MailProvider`] trait and its two
//! implementations:
//!
//! - [`GmailProvider`] - Gmail REST API with Google OAuth 2.0
//! - [`OutlookProvider`] - Microsoft Graph with the Microsoft identity platform
//!
//! # Architecture
//!
//! Each provider is a stateless client. It handles:
//!
//! - Building authorization URLs and exchanging/refreshing tokens
//! - Listing unread messages and normalizing them into [`NormalizedMessage`]
//! - Marking individual messages as read
//!
//! [`NormalizedMessage`]: crate::domain::NormalizedMessage
//!
//! # Example
//!
//! ```ignore
//! use unified_inbox::providers::email::{GmailProvider, MailProvider, PageSize};
//!
//! async fn print_unread(provider: &dyn MailProvider, token: &str) {
//!     let messages = provider
//!         .fetch_unread_messages(token, PageSize::default())
//!         .await
//!         .expect("failed to fetch unread messages");
//!
//!     for message in messages {
//!         println!("{}: {}", message.from(), message.subject());
//!     }
//! }
//! ```

mod gmail;
mod http;
mod oauth;
mod outlook;
mod traits;

pub use gmail::{GmailEndpoints, GmailProvider, DEFAULT_GMAIL_SCOPES};
pub use oauth::generate_state;
pub use outlook::{OutlookEndpoints, OutlookProvider, DEFAULT_OUTLOOK_SCOPES};
pub use traits::{MailProvider, PageSize, ProviderError, Result};
