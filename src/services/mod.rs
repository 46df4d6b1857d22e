//! Business services layer.
//!
//! Services sit between the caller (a dashboard view, the command-line
//! binary) and the provider clients:
//!
//! ```text
//! Caller (view state, tokens)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Providers (Gmail API, Microsoft Graph)
//! ```
//!
//! - [`InboxService`]: merges unread mail from every connected provider

mod inbox_service;

pub use inbox_service::{
    merge_messages, sort_by_date_desc, sort_by_id_desc, InboxFeed, InboxService, InboxState,
    ProviderFailure, ProviderStatus, ProviderTokens,
};
