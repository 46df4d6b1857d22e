//! External service provider implementations.
//!
//! - [`email`] - Mailbox providers (Gmail API, Microsoft Graph)

pub mod email;
