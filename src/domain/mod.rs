//! Domain types for the unified inbox.
//!
//! This module contains the provider-independent message shape, provider
//! identifiers, and the OAuth token types exchanged with identity providers.

mod message;
mod token;
mod types;

pub use message::NormalizedMessage;
pub use token::{RefreshedToken, TokenResponse, UserProfile};
pub use types::ProviderKind;
