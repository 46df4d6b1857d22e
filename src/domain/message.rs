//! Normalized message type.
//!
//! Every provider maps its own wire shape into [`NormalizedMessage`] at the
//! parse boundary, so the rest of the crate never sees provider JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderKind;

/// An unread message in the provider-independent shape.
///
/// Identity is the `(provider, id)` pair; `id` alone may collide across
/// providers. Fields are read-only once the message has been built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    id: String,
    thread_or_conversation_id: String,
    from: String,
    to: String,
    subject: String,
    body: String,
    date: String,
    provider: ProviderKind,
}

impl NormalizedMessage {
    /// Creates a message with the given identity and empty content fields.
    pub fn new(
        provider: ProviderKind,
        id: impl Into<String>,
        thread_or_conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            thread_or_conversation_id: thread_or_conversation_id.into(),
            from: String::new(),
            to: String::new(),
            subject: String::new(),
            body: String::new(),
            date: String::new(),
            provider,
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the raw date string as reported by the provider.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gmail thread ID or Outlook conversation ID.
    pub fn thread_or_conversation_id(&self) -> &str {
        &self.thread_or_conversation_id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Raw date string; empty when the provider did not report one.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// The globally unique key of this message.
    pub fn key(&self) -> (ProviderKind, &str) {
        (self.provider, &self.id)
    }

    /// Parses the date into a timestamp.
    ///
    /// Gmail reports RFC 2822 `Date` headers and Outlook reports RFC 3339
    /// `receivedDateTime` values; both are accepted. Returns `None` for empty
    /// or unparseable dates.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date)
    }
}

/// Parses an RFC 3339 or RFC 2822 date, ignoring a trailing `(Zone)` comment.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    let without_comment = match raw.rfind('(') {
        Some(idx) if raw.ends_with(')') => raw[..idx].trim_end(),
        _ => raw,
    };
    DateTime::parse_from_rfc2822(without_comment)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
