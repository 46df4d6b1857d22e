//! Token storage.
//!
//! The core never reads tokens from ambient state. Callers hand them in,
//! typically loaded through a [`TokenStore`].

mod tokens;

pub use tokens::{
    access_token_key, refresh_token_key, InMemoryTokenStore, Result, TokenStore, TokenStoreError,
};
