use async_trait::async_trait;
use scorecard::airtable::{
    fetch_all, AirtableError, ListRequest, RawRecord, RecordPage, RecordTransport, RetryPolicy,
};
use serde_json::Map;
use std::sync::Mutex;
use std::time::Duration;

fn record(id: &str) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        fields: Map::new(),
    }
}

/// Serves a scripted page sequence and logs every request it sees.
struct PagedTransport {
    pages: Vec<RecordPage>,
    seen: Mutex<Vec<ListRequest>>,
}

impl PagedTransport {
    fn new(pages: Vec<RecordPage>) -> Self {
        Self {
            pages,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ListRequest> {
        self.seen.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl RecordTransport for PagedTransport {
    async fn list_page(&self, request: &ListRequest) -> Result<RecordPage, AirtableError> {
        let mut seen = self.seen.lock().expect("request log poisoned");
        seen.push(request.clone());
        let index = seen.len() - 1;
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| AirtableError::Fetch {
                table: request.table.clone(),
                message: "no more scripted pages".to_string(),
            })
    }

    async fn patch_record(
        &self,
        table: &str,
        record_id: &str,
        _patch: Map<String, serde_json::Value>,
    ) -> Result<(), AirtableError> {
        Err(AirtableError::Update {
            table: table.to_string(),
            record_id: record_id.to_string(),
            message: "unexpected write".to_string(),
        })
    }
}

/// Fails a fixed number of times before succeeding.
struct FlakyTransport {
    failures_remaining: Mutex<u32>,
    calls: Mutex<u32>,
}

impl FlakyTransport {
    fn new(failures: u32) -> Self {
        Self {
            failures_remaining: Mutex::new(failures),
            calls: Mutex::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        *self.calls.lock().expect("call counter poisoned")
    }
}

#[async_trait]
impl RecordTransport for FlakyTransport {
    async fn list_page(&self, request: &ListRequest) -> Result<RecordPage, AirtableError> {
        *self.calls.lock().expect("call counter poisoned") += 1;
        let mut remaining = self.failures_remaining.lock().expect("failure counter poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(AirtableError::Fetch {
                table: request.table.clone(),
                message: "transient outage".to_string(),
            });
        }
        Ok(RecordPage {
            records: vec![record("recOk")],
            offset: None,
        })
    }

    async fn patch_record(
        &self,
        _table: &str,
        _record_id: &str,
        _patch: Map<String, serde_json::Value>,
    ) -> Result<(), AirtableError> {
        Ok(())
    }
}

#[tokio::test]
async fn pagination_follows_cursor_until_exhausted() {
    let transport = PagedTransport::new(vec![
        RecordPage {
            records: vec![record("rec1"), record("rec2")],
            offset: Some("cursor-a".to_string()),
        },
        RecordPage {
            records: vec![record("rec3")],
            offset: Some("cursor-b".to_string()),
        },
        RecordPage {
            records: vec![record("rec4"), record("rec5")],
            offset: None,
        },
    ]);

    let records = fetch_all(&transport, ListRequest::table("KPIs"), &RetryPolicy::none())
        .await
        .expect("all pages fetched");

    let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["rec1", "rec2", "rec3", "rec4", "rec5"]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3, "exactly one request per page");
    assert_eq!(requests[0].offset, None);
    assert_eq!(requests[1].offset.as_deref(), Some("cursor-a"));
    assert_eq!(requests[2].offset.as_deref(), Some("cursor-b"));
}

#[tokio::test]
async fn pagination_preserves_filter_and_sort_across_pages() {
    let transport = PagedTransport::new(vec![
        RecordPage {
            records: vec![record("rec1")],
            offset: Some("cursor-a".to_string()),
        },
        RecordPage {
            records: vec![],
            offset: None,
        },
    ]);

    let request = ListRequest::table("Audit Items").with_filter("{Function} = 'Marketing'");
    fetch_all(&transport, request, &RetryPolicy::none())
        .await
        .expect("pages fetched");

    for seen in transport.requests() {
        assert_eq!(
            seen.filter_by_formula.as_deref(),
            Some("{Function} = 'Marketing'"),
            "continuation request keeps the original filter"
        );
    }
}

#[tokio::test]
async fn retry_succeeds_after_transient_failures() {
    let transport = FlakyTransport::new(2);
    let retry = RetryPolicy {
        attempts: 3,
        delay: Duration::ZERO,
    };

    let records = fetch_all(&transport, ListRequest::table("KPIs"), &retry)
        .await
        .expect("third attempt succeeds");

    assert_eq!(records.len(), 1);
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn retry_surfaces_the_last_error_after_final_attempt() {
    let transport = FlakyTransport::new(10);
    let retry = RetryPolicy {
        attempts: 3,
        delay: Duration::ZERO,
    };

    let err = fetch_all(&transport, ListRequest::table("KPIs"), &retry)
        .await
        .expect_err("all attempts exhausted");

    assert_eq!(transport.call_count(), 3);
    assert!(matches!(err, AirtableError::Fetch { .. }));
}

#[tokio::test]
async fn domain_errors_pass_through_without_retry_noise() {
    struct MissingTable;

    #[async_trait]
    impl RecordTransport for MissingTable {
        async fn list_page(&self, request: &ListRequest) -> Result<RecordPage, AirtableError> {
            Err(AirtableError::TableNotFound {
                table: request.table.clone(),
            })
        }

        async fn patch_record(
            &self,
            _table: &str,
            _record_id: &str,
            _patch: Map<String, serde_json::Value>,
        ) -> Result<(), AirtableError> {
            Ok(())
        }
    }

    let err = fetch_all(
        &MissingTable,
        ListRequest::table("Nonexistent"),
        &RetryPolicy::none(),
    )
    .await
    .expect_err("missing table surfaces");

    match err {
        AirtableError::TableNotFound { table } => assert_eq!(table, "Nonexistent"),
        other => panic!("unexpected error: {other}"),
    }
}
