use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::{Connection, Token};
use crate::devops::api::Connector;
use crate::devops::models::ListResponse;
use crate::error::{FreeCicdError, Result};

pub(super) const API_VERSION: &str = "7.1";
pub(super) const TASK_API_VERSION: &str = "7.1-preview.2";
pub(super) const QUEUE_API_VERSION: &str = "7.1-preview.1";
const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// REST session bound to one organization.
///
/// Requests are not retried. Dropping the client ends the session.
pub struct DevOpsClient {
    client: Client,
    org_url: Url,
    token: Token,
    cancel: CancellationToken,
}

impl DevOpsClient {
    pub fn connect(
        base_url: &str,
        connection: &Connection,
        cancel: CancellationToken,
    ) -> Result<Self> {
        connection.validate()?;

        let client = Client::builder()
            .user_agent(concat!("freecicd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FreeCicdError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let organization = urlencoding::encode(&connection.organization);
        let org_url = Url::parse(&base)
            .and_then(|url| url.join(&format!("{organization}/")))
            .map_err(|e| FreeCicdError::Config(format!("Invalid base URL: {e}")))?;

        debug!("Opened Azure DevOps session for {org_url}");

        Ok(Self {
            client,
            org_url,
            token: connection.token.clone(),
            cancel,
        })
    }

    pub fn org_url(&self) -> &Url {
        &self.org_url
    }

    /// Organization-scoped endpoint, e.g. `_apis/projects`.
    pub(super) fn org_endpoint(&self, path: &str) -> Result<Url> {
        self.org_url
            .join(path)
            .map_err(|e| FreeCicdError::Config(format!("Invalid request URL '{path}': {e}")))
    }

    /// Project-scoped endpoint, e.g. `<project>/_apis/git/repositories`.
    pub(super) fn project_endpoint(&self, project: &str, path: &str) -> Result<Url> {
        self.org_endpoint(&format!("{}/{path}", urlencoding::encode(project)))
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth("", Some(self.token.as_str()))
    }

    fn with_version(mut url: Url, api_version: &str) -> Url {
        url.query_pairs_mut().append_pair("api-version", api_version);
        url
    }

    /// Sends a request, racing it against the session's cancellation token.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let request = self.auth_request(request);

        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(FreeCicdError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FreeCicdError::NotFound(what.to_string()));
        }
        // Azure DevOps answers unauthenticated calls with a sign-in page.
        if status == StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Err(FreeCicdError::Api {
                status: status.as_u16(),
                message: "Request was not authenticated; check the access token".to_string(),
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(FreeCicdError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(FreeCicdError::Cancelled),
            body = response.json::<T>() => Ok(body?),
        }
    }

    pub(super) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        api_version: &str,
        what: &str,
    ) -> Result<T> {
        let url = Self::with_version(url, api_version);
        debug!("GET {url}");
        let response = self.send(self.client.get(url), what).await?;
        self.read_json(response).await
    }

    /// Fetches every page of a collection, following continuation tokens.
    pub(super) async fn get_list<T: DeserializeOwned>(
        &self,
        url: Url,
        api_version: &str,
        what: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut page_url = Self::with_version(url.clone(), api_version);
            if let Some(token) = &continuation {
                page_url
                    .query_pairs_mut()
                    .append_pair("continuationToken", token);
            }
            debug!("GET {page_url}");

            let response = self.send(self.client.get(page_url), what).await?;
            let next = response
                .headers()
                .get(CONTINUATION_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(ToString::to_string);

            let page: ListResponse<T> = self.read_json(response).await?;
            items.extend(page.value);

            match next {
                Some(token) if continuation.as_deref() != Some(token.as_str()) => {
                    continuation = Some(token);
                }
                _ => break,
            }
        }

        Ok(items)
    }

    pub(super) async fn send_json<B, T>(
        &self,
        method: Method,
        url: Url,
        api_version: &str,
        body: &B,
        what: &str,
    ) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = Self::with_version(url, api_version);
        debug!("{method} {url}");
        let response = self
            .send(self.client.request(method, url).json(body), what)
            .await?;
        self.read_json(response).await
    }
}

impl Drop for DevOpsClient {
    fn drop(&mut self) {
        debug!("Closed Azure DevOps session for {}", self.org_url);
    }
}

/// Opens REST sessions against a fixed service root.
#[derive(Debug, Clone)]
pub struct RestConnector {
    base_url: String,
}

impl RestConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Connector for RestConnector {
    type Session = DevOpsClient;

    fn connect(&self, connection: &Connection, cancel: CancellationToken) -> Result<DevOpsClient> {
        DevOpsClient::connect(&self.base_url, connection, cancel)
    }
}
