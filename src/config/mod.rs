//! Configuration and settings management.
//!
//! Settings are stored in the user's config directory as JSON and may be
//! overridden from the environment.

mod settings;

pub use settings::{
    ConfigError, GmailSettings, InboxSettings, OutlookSettings, ProviderSettings, Settings,
    ENV_PREFIX,
};
