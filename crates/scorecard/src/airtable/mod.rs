//! Client for the external tabular record store (Airtable).
//!
//! All network access goes through the [`RecordTransport`] trait so the
//! service layer can be exercised against in-memory fakes. The concrete
//! [`AirtableClient`] speaks the v0 REST surface: cursor-based pagination on
//! reads, id-keyed partial patches on writes.

pub mod fields;

use crate::config::AirtableConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Airtable caps `pageSize` at 100; larger requests are truncated server-side
/// anyway, so we clamp locally.
pub const MAX_PAGE_SIZE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// One read query against a table, including the continuation cursor when
/// following pagination.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub table: String,
    pub filter_by_formula: Option<String>,
    pub sort: Vec<SortKey>,
    pub view: Option<String>,
    pub page_size: Option<u8>,
    pub offset: Option<String>,
}

impl ListRequest {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, formula: impl Into<String>) -> Self {
        self.filter_by_formula = Some(formula.into());
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    fn effective_page_size(&self) -> u8 {
        self.page_size.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }
}

/// Raw record as returned by the store: an opaque id plus an untyped field
/// bag. Domain decoding happens exactly once, in `domain::*::decode`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// One page of a listing plus the cursor for the next page, if any.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPage {
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub offset: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AirtableError {
    #[error("table '{table}' not found")]
    TableNotFound { table: String },
    #[error("record store rejected the configured credentials")]
    InvalidCredentials,
    #[error("record '{record_id}' not found in '{table}'")]
    RecordNotFound { table: String, record_id: String },
    #[error("failed to fetch records from '{table}': {message}")]
    Fetch { table: String, message: String },
    #[error("failed to update record '{record_id}' in '{table}': {message}")]
    Update {
        table: String,
        record_id: String,
        message: String,
    },
    #[error("record store transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Seam between the service layer and the wire. Implemented by
/// [`AirtableClient`] in production and by in-memory fakes in tests.
#[async_trait]
pub trait RecordTransport: Send + Sync {
    async fn list_page(&self, request: &ListRequest) -> Result<RecordPage, AirtableError>;

    async fn patch_record(
        &self,
        table: &str,
        record_id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), AirtableError>;
}

/// Fixed-attempt, fixed-delay retry applied uniformly to every store call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Run without retrying; useful in tests asserting request counts.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, AirtableError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AirtableError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.attempts => {
                    warn!(attempt, error = %err, "record store call failed, retrying");
                    tokio::time::sleep(self.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Fetch every record matching `request`, following continuation cursors
/// until the store stops returning one. Pages are concatenated in receipt
/// order; each page request individually goes through the retry policy.
pub async fn fetch_all<T>(
    transport: &T,
    mut request: ListRequest,
    retry: &RetryPolicy,
) -> Result<Vec<RawRecord>, AirtableError>
where
    T: RecordTransport + ?Sized,
{
    let mut records = Vec::new();
    loop {
        let page = retry.run(|| transport.list_page(&request)).await?;
        records.extend(page.records);
        match page.offset {
            Some(cursor) => request.offset = Some(cursor),
            None => return Ok(records),
        }
    }
}

/// HTTPS client for the Airtable v0 API, bearer-token authenticated.
#[derive(Debug, Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AirtableClient {
    pub fn new(config: &AirtableConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/{}", config.api_url, config.base_id),
            api_key: config.api_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn query_pairs(request: &ListRequest) -> Vec<(String, String)> {
        let mut pairs = vec![(
            "pageSize".to_string(),
            request.effective_page_size().to_string(),
        )];
        if let Some(formula) = &request.filter_by_formula {
            pairs.push(("filterByFormula".to_string(), formula.clone()));
        }
        if let Some(view) = &request.view {
            pairs.push(("view".to_string(), view.clone()));
        }
        for (index, key) in request.sort.iter().enumerate() {
            pairs.push((format!("sort[{index}][field]"), key.field.clone()));
            pairs.push((
                format!("sort[{index}][direction]"),
                key.direction.as_param().to_string(),
            ));
        }
        if let Some(offset) = &request.offset {
            pairs.push(("offset".to_string(), offset.clone()));
        }
        pairs
    }

    /// Pull a human-readable message out of an error body. The store answers
    /// with either `{"error": "CODE"}` or `{"error": {"message": "..."}}`.
    fn error_message(status: reqwest::StatusCode, body: &str) -> String {
        let parsed = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| match value.get("error") {
                Some(Value::String(code)) => Some(code.clone()),
                Some(Value::Object(object)) => object
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            });

        parsed.unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        })
    }
}

#[async_trait]
impl RecordTransport for AirtableClient {
    async fn list_page(&self, request: &ListRequest) -> Result<RecordPage, AirtableError> {
        let response = self
            .http
            .get(self.table_url(&request.table))
            .bearer_auth(&self.api_key)
            .query(&Self::query_pairs(request))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AirtableError::TableNotFound {
                table: request.table.clone(),
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AirtableError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AirtableError::Fetch {
                table: request.table.clone(),
                message: Self::error_message(status, &body),
            });
        }

        Ok(response.json::<RecordPage>().await?)
    }

    async fn patch_record(
        &self,
        table: &str,
        record_id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), AirtableError> {
        let url = format!("{}/{}", self.table_url(table), record_id);
        let body = serde_json::json!({ "fields": patch });
        let response = self
            .http
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AirtableError::RecordNotFound {
                table: table.to_string(),
                record_id: record_id.to_string(),
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AirtableError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AirtableError::Update {
                table: table.to_string(),
                record_id: record_id.to_string(),
                message: Self::error_message(status, &body),
            });
        }

        Ok(())
    }
}
