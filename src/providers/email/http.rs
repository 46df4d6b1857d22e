//! Request helpers shared by the provider clients.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{ProviderError, Result};

/// Error body shapes returned by Google and Microsoft endpoints.
///
/// Graph APIs nest the details under an `error` object; OAuth token
/// endpoints use flat `error` / `error_description` strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Graph {
        error: GraphError,
    },
    OAuth {
        error: Option<String>,
        error_description: Option<String>,
    },
}

/// Nested error object. Graph uses string codes, Google numeric ones.
#[derive(Debug, Deserialize)]
struct GraphError {
    code: Option<serde_json::Value>,
    message: Option<String>,
}

impl ErrorBody {
    fn into_description(self) -> Option<String> {
        let text = match self {
            ErrorBody::Graph { error } => error
                .message
                .or_else(|| error.code.and_then(|c| c.as_str().map(str::to_string))),
            ErrorBody::OAuth {
                error,
                error_description,
            } => error_description.or(error),
        };
        text.filter(|t| !t.trim().is_empty())
    }
}

/// Extracts a provider description from an error response body, if any.
pub(crate) fn describe_error_body(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_description)
}

/// Appends path segments to an API base, percent-encoding each one.
///
/// Message ids are opaque; a `/`, `?` or `#` inside one stays part of its
/// segment.
pub(crate) fn resource_url(api_base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(api_base)
        .map_err(|e| ProviderError::InvalidRequest(format!("api base {}: {}", api_base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ProviderError::InvalidRequest(format!("api base {} cannot have a path", api_base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Sends a request, mapping transport failures to [`ProviderError::Connection`].
pub(crate) async fn send(request: RequestBuilder) -> Result<Response> {
    request
        .send()
        .await
        .map_err(|e| ProviderError::Connection(e.to_string()))
}

/// Consumes a failed response, returning its status and parsed description.
pub(crate) async fn failure(response: Response) -> (u16, Option<String>) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, describe_error_body(&body))
}

/// Decodes a successful JSON response body.
pub(crate) async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
}
