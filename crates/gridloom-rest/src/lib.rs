//! REST implementation of the gridloom remote-source contract
//!
//! Speaks the backend's list/detail conventions: `GET <base>/<table>/` with
//! `limit`/`offset` pagination returning `{results, count}`, `POST` for
//! create, `PATCH <id>/` for partial update, `DELETE <id>/`, and `OPTIONS`
//! whose `actions.POST` metadata describes the record shape.

mod decode;

pub use decode::{decode_options, decode_schema};

use async_trait::async_trait;
use gridloom_core::{GridError, ListPage, ListParams, Record, RemoteSource, Result, SchemaTree};
use serde::Deserialize;
use url::Url;

/// Paginated list envelope
#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    count: u64,
    results: Vec<Record>,
}

/// A [`RemoteSource`] backed by an HTTP API.
#[derive(Debug, Clone)]
pub struct RestSource {
    base: Url,
    client: reqwest::Client,
}

impl RestSource {
    pub fn new(base: Url) -> Self {
        Self::with_client(base, reqwest::Client::new())
    }

    /// Use a preconfigured client (auth headers, timeouts) owned by the caller.
    pub fn with_client(base: Url, client: reqwest::Client) -> Self {
        Self { base, client }
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GridError::Other("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(table)
            .push("");
        Ok(url)
    }

    fn record_url(&self, table: &str, id: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GridError::Other("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(table)
            .push(id)
            .push("");
        Ok(url)
    }
}

fn transport(error: reqwest::Error) -> GridError {
    GridError::Transport(error.to_string())
}

/// Surface non-2xx responses as remote errors carrying status and body text.
async fn checked(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(GridError::Remote {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteSource for RestSource {
    #[tracing::instrument(skip(self, params))]
    async fn list(&self, table: &str, params: &ListParams) -> Result<ListPage> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().extend_pairs(params.to_pairs());

        tracing::debug!(url = %url, "listing records");
        let response = self.client.get(url).send().await.map_err(transport)?;
        let page: RawPage = checked(response)
            .await?
            .json()
            .await
            .map_err(transport)?;

        tracing::debug!(table = %table, results = page.results.len(), count = page.count, "page loaded");
        Ok(ListPage {
            results: page.results,
            count: page.count,
        })
    }

    #[tracing::instrument(skip(self, body))]
    async fn create(&self, table: &str, body: &Record) -> Result<Record> {
        let url = self.table_url(table)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        checked(response).await?.json().await.map_err(transport)
    }

    #[tracing::instrument(skip(self, body))]
    async fn update(&self, table: &str, id: &str, body: &Record) -> Result<Record> {
        let url = self.record_url(table, id)?;
        let response = self
            .client
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        checked(response).await?.json().await.map_err(transport)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let url = self.record_url(table, id)?;
        let response = self.client.delete(url).send().await.map_err(transport)?;
        checked(response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn options(&self, table: &str) -> Result<SchemaTree> {
        let url = self.table_url(table)?;
        let response = self
            .client
            .request(reqwest::Method::OPTIONS, url)
            .send()
            .await
            .map_err(transport)?;
        let body: serde_json::Value = checked(response)
            .await?
            .json()
            .await
            .map_err(transport)?;
        decode_options(&body)
    }
}
