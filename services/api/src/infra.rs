use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use scorecard::airtable::{AirtableError, ListRequest, RawRecord, RecordPage, RecordTransport};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory record store used by `serve --offline` for stakeholder demos
/// and by the route tests. Serves whole tables as single pages, honors the
/// `RECORD_ID()` point-read filter, and applies patches in place.
#[derive(Default)]
pub(crate) struct InMemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<RawRecord>>>,
}

impl InMemoryRecordStore {
    pub(crate) fn insert_table(&self, table: &str, records: Vec<RawRecord>) {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .insert(table.to_string(), records);
    }
}

fn record_id_filter(formula: &str) -> Option<&str> {
    formula
        .trim()
        .strip_prefix("RECORD_ID() = '")?
        .strip_suffix('\'')
}

#[async_trait]
impl RecordTransport for InMemoryRecordStore {
    async fn list_page(&self, request: &ListRequest) -> Result<RecordPage, AirtableError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        let records = tables
            .get(&request.table)
            .ok_or_else(|| AirtableError::TableNotFound {
                table: request.table.clone(),
            })?;

        let records = match request
            .filter_by_formula
            .as_deref()
            .and_then(record_id_filter)
        {
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
        let mut tables = self.tables.lock().expect("store mutex poisoned");
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
        for (key, value) in patch {
            target.fields.insert(key, value);
        }
        Ok(())
    }
}

fn record(id: &str, fields: Value) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        fields: fields.as_object().expect("object literal").clone(),
    }
}

/// Sample base covering every view: scored KPIs across two functions, a
/// small audit checklist, and a handful of task records.
pub(crate) fn demo_store() -> InMemoryRecordStore {
    let store = InMemoryRecordStore::default();

    store.insert_table(
        "KPIs",
        vec![
            record(
                "recLeads",
                json!({
                    "Name": "Monthly Qualified Leads",
                    "Type": "Principal",
                    "Functions": "Marketing",
                    "Current Value": 120,
                    "Previous Value": 95,
                    "Status": "OK",
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
                "recCac",
                json!({
                    "Name": "Customer Acquisition Cost",
                    "Type": "Secondaire",
                    "Functions": "Marketing, Sales",
                    "Current Value": 480,
                    "Status": "Warning",
                    "Impact Weight": 0.5,
                    "Category Weight": 0.8,
                    "Scaling Factor": 1.2,
                    "Impact Type": "Linear",
                    "Impact Direction": "Inverse",
                    "Baseline Revenue": 1_000_000,
                    "EBITDA Factor": 0.2,
                    "Min Benchmark": 200,
                    "Max Benchmark": 600,
                }),
            ),
            record(
                "recNrr",
                json!({
                    "Name": "Net Revenue Retention",
                    "Type": "Secondaire",
                    "Functions": "Sales",
                    "Current Value": 104,
                    "Status": "OK",
                    "Impact Weight": 2,
                    "Category Weight": 1,
                    "Scaling Factor": 1,
                    "Impact Type": "Exponential",
                    "Impact Direction": "Direct",
                    "Baseline Revenue": 2_500_000,
                    "EBITDA Factor": 0.25,
                    "Min Benchmark": 80,
                    "Max Benchmark": 130,
                }),
            ),
        ],
    );

    store.insert_table(
        "Audit Items",
        vec![
            record(
                "recAudit1",
                json!({
                    "Function": "Marketing",
                    "Problem": "Lead Generation",
                    "Sub Problem": "Paid Channels",
                    "Category": "Attribution",
                    "Item": "UTM coverage",
                    "Action Required": "Tag all campaigns",
                    "Status": "Completed",
                    "Criticality": "High",
                    "Score": 6,
                }),
            ),
            record(
                "recAudit2",
                json!({
                    "Function": "Marketing",
                    "Problem": "Lead Generation",
                    "Sub Problem": "Paid Channels",
                    "Category": "Attribution",
                    "Item": "Budget pacing alerts",
                    "Action Required": "Configure pacing rules",
                    "Status": "In Progress",
                    "Criticality": "Medium",
                    "Score": 8,
                }),
            ),
            record(
                "recAudit3",
                json!({
                    "Function": "Sales",
                    "Problem": "Pipeline Hygiene",
                    "Sub Problem": "Stage Discipline",
                    "Category": "CRM",
                    "Item": "Stale opportunity sweep",
                    "Action Required": "Close or recycle aged deals",
                    "Status": "Not Started",
                    "Criticality": "High",
                }),
            ),
        ],
    );

    store.insert_table(
        "Action Items",
        vec![
            record(
                "recTask1",
                json!({
                    "Task": "Refresh landing pages",
                    "Function": "Marketing",
                    "Status": "In Progress",
                    "Priority": "High",
                    "Estimated Hours": 12,
                    "Actual Hours": 5,
                    "Due Date": "2026-09-15",
                }),
            ),
            record(
                "recTask2",
                json!({
                    "Task": "Roll out CRM stage playbook",
                    "Function": "Sales",
                    "Status": "Not Started",
                    "Priority": "Medium",
                    "Estimated Hours": 8,
                }),
            ),
        ],
    );

    store.insert_table(
        "Project Items",
        vec![record(
            "recProject1",
            json!({
                "Task": "Quarterly audit remediation",
                "Function": "Operations",
                "Status": "In Progress",
                "Priority": "High",
                "Estimated Hours": 40,
                "Actual Hours": 16,
                "Due Date": "2026-10-01",
            }),
        )],
    );

    store
}
