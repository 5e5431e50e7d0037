use async_trait::async_trait;
use scorecard::airtable::{AirtableError, ListRequest, RawRecord, RecordPage, RecordTransport};
use scorecard::domain::{AuditStatus, Criticality};
use scorecard::service::{ScorecardError, ScorecardService, SimulationRequest};
use scorecard::{RetryPolicy, TableNames};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn record(id: &str, fields: Value) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        fields: fields.as_object().expect("object literal").clone(),
    }
}

#[derive(Debug, Clone)]
struct PatchCall {
    table: String,
    record_id: String,
    fields: Map<String, Value>,
}

/// In-memory stand-in for the record store: serves whole tables as single
/// pages, honors the `RECORD_ID()` filter the service uses for point reads,
/// and applies patches so follow-up reads see them.
#[derive(Default)]
struct InMemoryStore {
    tables: Mutex<HashMap<String, Vec<RawRecord>>>,
    patches: Mutex<Vec<PatchCall>>,
    list_calls: Mutex<u32>,
}

impl InMemoryStore {
    fn with_table(self, table: &str, records: Vec<RawRecord>) -> Self {
        self.tables
            .lock()
            .expect("tables poisoned")
            .insert(table.to_string(), records);
        self
    }

    fn patch_log(&self) -> Vec<PatchCall> {
        self.patches.lock().expect("patch log poisoned").clone()
    }

    fn list_call_count(&self) -> u32 {
        *self.list_calls.lock().expect("counter poisoned")
    }

    fn record_fields(&self, table: &str, id: &str) -> Map<String, Value> {
        self.tables
            .lock()
            .expect("tables poisoned")
            .get(table)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .map(|r| r.fields.clone())
            .expect("record present")
    }
}

fn record_id_filter(formula: &str) -> Option<String> {
    let formula = formula.trim();
    let inner = formula.strip_prefix("RECORD_ID() = '")?;
    inner.strip_suffix('\'').map(str::to_string)
}

#[async_trait]
impl RecordTransport for InMemoryStore {
    async fn list_page(&self, request: &ListRequest) -> Result<RecordPage, AirtableError> {
        *self.list_calls.lock().expect("counter poisoned") += 1;
        let tables = self.tables.lock().expect("tables poisoned");
        let records = tables
            .get(&request.table)
            .ok_or_else(|| AirtableError::TableNotFound {
                table: request.table.clone(),
            })?;

        let records = match request.filter_by_formula.as_deref().and_then(record_id_filter) {
            Some(id) => records.iter().filter(|r| r.id == id).cloned().collect(),
            None => records.clone(),
        };

        Ok(RecordPage {
            records,
            offset: None,
        })
    }

    async fn patch_record(
        &self,
        table: &str,
        record_id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), AirtableError> {
        let mut tables = self.tables.lock().expect("tables poisoned");
        let records = tables
            .get_mut(table)
            .ok_or_else(|| AirtableError::TableNotFound {
                table: table.to_string(),
            })?;
        let target = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| AirtableError::RecordNotFound {
                table: table.to_string(),
                record_id: record_id.to_string(),
            })?;
        for (key, value) in &patch {
            target.fields.insert(key.clone(), value.clone());
        }

        self.patches.lock().expect("patch log poisoned").push(PatchCall {
            table: table.to_string(),
            record_id: record_id.to_string(),
            fields: patch,
        });
        Ok(())
    }
}

fn seeded_store() -> InMemoryStore {
    InMemoryStore::default()
        .with_table(
            "KPIs",
            vec![
                record(
                    "recLeads",
                    json!({
                        "Name": "Monthly Qualified Leads",
                        "Functions": "Marketing",
                        "Current Value": 100,
                        "Impact Weight": 1,
                        "Category Weight": 1,
                        "Scaling Factor": 1,
                        "Impact Type": "Linear",
                        "Impact Direction": "Direct",
                        "Baseline Revenue": 1_000_000,
                        "EBITDA Factor": 0.2,
                        "Min Benchmark": 0,
                        "Max Benchmark": 200,
                    }),
                ),
                record(
                    "recChurn",
                    json!({
                        "Name": "Churn Rate",
                        "Functions": "Sales",
                        "Current Value": 150,
                        "Min Benchmark": 0,
                        "Max Benchmark": 100,
                    }),
                ),
            ],
        )
        .with_table(
            "Audit Items",
            vec![
                record(
                    "recAudit1",
                    json!({
                        "Function": "Marketing",
                        "Problem": "P1",
                        "Sub Problem": "S1",
                        "Category": "C1",
                        "Item": "UTM coverage",
                        "Status": "Completed",
                        "Score": 6,
                    }),
                ),
                record(
                    "recAudit2",
                    json!({
                        "Function": "Marketing",
                        "Problem": "P1",
                        "Sub Problem": "S1",
                        "Category": "C1",
                        "Item": "Budget pacing",
                        "Status": "In Progress",
                        "Score": 8,
                    }),
                ),
                // Missing Sub Problem: must be skipped, not crash the build.
                record(
                    "recAudit3",
                    json!({
                        "Function": "Marketing",
                        "Problem": "P1",
                        "Category": "C1",
                        "Item": "Orphan",
                        "Status": "Completed",
                    }),
                ),
            ],
        )
        .with_table(
            "Action Items",
            vec![record(
                "recTask1",
                json!({
                    "Task": "Refresh landing pages",
                    "Function": "Marketing",
                    "Priority": "High",
                    "Due Date": "2026-09-15",
                }),
            )],
        )
}

fn make_service(store: InMemoryStore) -> (Arc<InMemoryStore>, ScorecardService<InMemoryStore>) {
    let store = Arc::new(store);
    let service = ScorecardService::new(store.clone(), TableNames::default(), RetryPolicy::none());
    (store, service)
}

#[tokio::test]
async fn dashboard_scores_derive_from_seeded_kpis() {
    let (_store, service) = make_service(seeded_store());
    let scores = service.dashboard().await.expect("scores computed");

    let names: Vec<_> = scores
        .functions
        .iter()
        .map(|entry| entry.function.as_str())
        .collect();
    assert_eq!(names, vec!["Marketing", "Sales"]);

    // Marketing: 100 of [0, 200] => 50. Sales: 150 clamps at max => 100.
    assert_eq!(scores.functions[0].score, 50.0);
    assert_eq!(scores.functions[1].score, 100.0);
    assert_eq!(scores.global, 75.0);
    assert_eq!(scores.global_display(), 7.5);
}

#[tokio::test]
async fn audit_hierarchy_rolls_up_and_skips_incomplete_paths() {
    let (_store, service) = make_service(seeded_store());
    let tree = service.audit_hierarchy().await.expect("tree built");

    let marketing = tree.get("Marketing").expect("marketing node");
    // The orphan item is excluded: 1 of 2 completed, mean of 6 and 8.
    assert_eq!(marketing.completion_rate, 50.0);
    assert_eq!(marketing.average_score, 7.0);

    let category = marketing
        .children
        .get("P1")
        .and_then(|p| p.children.get("S1"))
        .and_then(|s| s.children.get("C1"))
        .expect("category node");
    assert_eq!(category.items.len(), 2);
}

#[tokio::test]
async fn overview_joins_scores_and_audit_tree() {
    let (_store, service) = make_service(seeded_store());
    let overview = service.overview().await.expect("overview built");
    assert_eq!(overview.scores.global, 75.0);
    assert!(overview.audit.contains_key("Marketing"));
}

#[tokio::test]
async fn simulation_reports_per_kpi_and_total_impact() {
    let (_store, service) = make_service(seeded_store());
    let outcome = service
        .simulate(&[SimulationRequest {
            kpi_id: "recLeads".to_string(),
            new_value: 150.0,
        }])
        .await
        .expect("simulation runs");

    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0].impact.revenue, 500_000);
    assert_eq!(outcome.entries[0].impact.ebitda, 100_000);
    assert_eq!(outcome.total.revenue, 500_000);
}

#[tokio::test]
async fn simulation_rejects_unknown_kpi_ids() {
    let (_store, service) = make_service(seeded_store());
    let err = service
        .simulate(&[SimulationRequest {
            kpi_id: "recMissing".to_string(),
            new_value: 10.0,
        }])
        .await
        .expect_err("unknown id rejected");
    assert!(matches!(err, ScorecardError::KpiNotFound(id) if id == "recMissing"));
}

#[tokio::test]
async fn kpi_value_update_swaps_current_into_previous() {
    let (store, service) = make_service(seeded_store());
    service
        .update_kpi_value("recLeads", 130.0)
        .await
        .expect("update applied");

    // Read-then-patch: one point read, one patch.
    assert_eq!(store.list_call_count(), 1);
    let patches = store.patch_log();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].table, "KPIs");
    assert_eq!(patches[0].record_id, "recLeads");

    let fields = store.record_fields("KPIs", "recLeads");
    assert_eq!(fields.get("Previous Value"), Some(&json!(100.0)));
    assert_eq!(fields.get("Current Value"), Some(&json!(130.0)));
}

#[tokio::test]
async fn audit_status_and_criticality_patches_use_store_labels() {
    let (store, service) = make_service(seeded_store());
    service
        .update_audit_status("recAudit2", AuditStatus::Completed)
        .await
        .expect("status patched");
    service
        .update_audit_criticality("recAudit2", Criticality::High)
        .await
        .expect("criticality patched");

    let fields = store.record_fields("Audit Items", "recAudit2");
    assert_eq!(fields.get("Status"), Some(&json!("Completed")));
    assert_eq!(fields.get("Criticality"), Some(&json!("High")));
}

#[tokio::test]
async fn task_fetch_decodes_defaults_and_dates() {
    let (_store, service) = make_service(seeded_store());
    let tasks = service
        .fetch_tasks(service.action_items_table())
        .await
        .expect("tasks fetched");

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].description, "Refresh landing pages");
    assert_eq!(tasks[0].priority, Criticality::High);
    assert_eq!(tasks[0].status, AuditStatus::NotStarted);
    assert!(tasks[0].due_date.is_some());
}

#[tokio::test]
async fn missing_table_fails_loud() {
    let (_store, service) = make_service(InMemoryStore::default());
    let err = service.fetch_kpis().await.expect_err("no tables seeded");
    assert!(matches!(err, AirtableError::TableNotFound { .. }));
}
