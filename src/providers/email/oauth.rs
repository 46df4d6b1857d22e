//! OAuth 2.0 authorization-code helpers shared by both providers.

use serde::de::DeserializeOwned;
use url::Url;

use super::{http, ProviderError, Result};
use crate::domain::ProviderKind;

/// Generates an unguessable `state` value for an authorization request.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Appends the given query parameters to an authorization endpoint.
///
/// `state` is only added when present.
pub(crate) fn authorization_url(
    endpoint: &str,
    params: &[(&str, &str)],
    state: Option<&str>,
) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| ProviderError::InvalidRequest(format!("authorization endpoint: {}", e)))?;

    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
        if let Some(state) = state {
            query.append_pair("state", state);
        }
    }

    Ok(url)
}

/// Posts a form-encoded grant to a token endpoint.
///
/// Any non-success status becomes [`ProviderError::AuthExchange`].
pub(crate) async fn request_token<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: ProviderKind,
    token_url: &str,
    params: &[(&str, &str)],
) -> Result<T> {
    let response = http::send(client.post(token_url).form(params)).await?;

    if !response.status().is_success() {
        let (status, description) = http::failure(response).await;
        return Err(ProviderError::AuthExchange {
            provider,
            status,
            description,
        });
    }

    http::json(response).await
}
