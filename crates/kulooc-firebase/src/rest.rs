//! Bearer-authenticated JSON transport shared by every API client.

use std::fmt;
use std::sync::Arc;

use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{FirebaseError, FirebaseResult};
use crate::token::TokenSource;

/// HTTP client bound to one API base URL.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    base: String,
}

impl RestClient {
    /// Bind a client and token source to `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError::InvalidUrl`] when `base_url` is not an absolute URL.
    pub fn new(
        client: Client,
        tokens: Arc<dyn TokenSource>,
        base_url: &str,
    ) -> FirebaseResult<Self> {
        Url::parse(base_url).map_err(|source| FirebaseError::InvalidUrl {
            value: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            client,
            tokens,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for an API path such as `v1/projects/p/rulesets`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Send a request and decode the JSON response.
    pub(crate) async fn call<B, T>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> FirebaseResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.tokens.access_token().await?;
        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| FirebaseError::Http { operation, source })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| FirebaseError::Http { operation, source })?;
        tracing::debug!(operation, %method, path, status = status.as_u16(), "firebase request");

        if !status.is_success() {
            return Err(FirebaseError::from_response(operation, status, text));
        }
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(|source| FirebaseError::Decode { operation, source })
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticToken;
    use anyhow::Result;
    use httpmock::prelude::*;
    use reqwest::Method;
    use serde_json::{Value, json};

    #[test]
    fn rejects_relative_base_url() {
        let result = RestClient::new(Client::new(), Arc::new(StaticToken::new("t")), "not a url");
        assert!(matches!(result, Err(FirebaseError::InvalidUrl { .. })));
    }

    #[test]
    fn joins_paths_without_double_slashes() -> Result<()> {
        let rest = RestClient::new(
            Client::new(),
            Arc::new(StaticToken::new("t")),
            "https://firestore.googleapis.com/",
        )?;
        assert_eq!(
            rest.url("/v1/projects/p"),
            "https://firestore.googleapis.com/v1/projects/p"
        );
        Ok(())
    }

    #[tokio::test]
    async fn sends_bearer_token_and_treats_empty_body_as_object() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/v1/thing")
                .header("authorization", "Bearer owner");
            then.status(200);
        });

        let rest = RestClient::new(
            Client::new(),
            Arc::new(StaticToken::new("owner")),
            &server.base_url(),
        )?;
        let value: Value = rest
            .call::<Value, _>("delete thing", Method::DELETE, "v1/thing", &[], None)
            .await?;
        assert_eq!(value, json!({}));
        mock.assert();
        Ok(())
    }
}
