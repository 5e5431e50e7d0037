//! Service composing the record store transport with decoding and the
//! derived computations. One instance per process, shared behind an `Arc`.

use crate::airtable::{fetch_all, AirtableError, ListRequest, RecordTransport, RetryPolicy};
use crate::analysis::{build_hierarchy, compute_scores, impact, total_impact};
use crate::analysis::{HierarchyNode, ImpactResult, Scores};
use crate::domain::{AuditItem, AuditStatus, Criticality, Kpi, TaskRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Store table names, overridable for bases that localize them.
#[derive(Debug, Clone)]
pub struct TableNames {
    pub kpis: String,
    pub audit_items: String,
    pub action_items: String,
    pub project_items: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            kpis: "KPIs".to_string(),
            audit_items: "Audit Items".to_string(),
            action_items: "Action Items".to_string(),
            project_items: "Project Items".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScorecardError {
    #[error(transparent)]
    Store(#[from] AirtableError),
    #[error("kpi '{0}' not found")]
    KpiNotFound(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationRequest {
    pub kpi_id: String,
    pub new_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationEntry {
    pub kpi_id: String,
    pub kpi_name: String,
    pub current_value: f64,
    pub new_value: f64,
    pub impact: ImpactResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutcome {
    pub entries: Vec<SimulationEntry>,
    pub total: ImpactResult,
}

/// Scores plus the audit tree, fetched concurrently for the landing view.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub scores: Scores,
    pub audit: BTreeMap<String, HierarchyNode>,
}

pub struct ScorecardService<T> {
    transport: Arc<T>,
    tables: TableNames,
    retry: RetryPolicy,
}

impl<T> ScorecardService<T>
where
    T: RecordTransport + 'static,
{
    pub fn new(transport: Arc<T>, tables: TableNames, retry: RetryPolicy) -> Self {
        Self {
            transport,
            tables,
            retry,
        }
    }

    pub async fn fetch_kpis(&self) -> Result<Vec<Kpi>, AirtableError> {
        let records = fetch_all(
            self.transport.as_ref(),
            ListRequest::table(&self.tables.kpis),
            &self.retry,
        )
        .await?;
        info!(count = records.len(), table = %self.tables.kpis, "fetched kpi records");
        Ok(records.iter().map(Kpi::decode).collect())
    }

    pub async fn fetch_audit_items(&self) -> Result<Vec<AuditItem>, AirtableError> {
        let records = fetch_all(
            self.transport.as_ref(),
            ListRequest::table(&self.tables.audit_items),
            &self.retry,
        )
        .await?;
        info!(count = records.len(), table = %self.tables.audit_items, "fetched audit records");
        Ok(records.iter().map(AuditItem::decode).collect())
    }

    /// Task records from either task table; `table` is the caller's pick
    /// (action items by default at the API layer).
    pub async fn fetch_tasks(&self, table: &str) -> Result<Vec<TaskRecord>, AirtableError> {
        let records = fetch_all(
            self.transport.as_ref(),
            ListRequest::table(table),
            &self.retry,
        )
        .await?;
        info!(count = records.len(), table, "fetched task records");
        Ok(records.iter().map(TaskRecord::decode).collect())
    }

    pub fn action_items_table(&self) -> &str {
        &self.tables.action_items
    }

    pub fn project_items_table(&self) -> &str {
        &self.tables.project_items
    }

    pub async fn dashboard(&self) -> Result<Scores, AirtableError> {
        let kpis = self.fetch_kpis().await?;
        Ok(compute_scores(&kpis))
    }

    pub async fn audit_hierarchy(&self) -> Result<BTreeMap<String, HierarchyNode>, AirtableError> {
        let items = self.fetch_audit_items().await?;
        Ok(build_hierarchy(&items))
    }

    /// Landing view: scores and audit tree, the two fetches issued
    /// concurrently and joined (no ordering dependency between them).
    pub async fn overview(&self) -> Result<DashboardOverview, AirtableError> {
        let (kpis, items) = tokio::join!(self.fetch_kpis(), self.fetch_audit_items());
        Ok(DashboardOverview {
            scores: compute_scores(&kpis?),
            audit: build_hierarchy(&items?),
        })
    }

    /// What-if simulation over the latest KPI list. Unknown ids are an
    /// error rather than a silent zero contribution.
    pub async fn simulate(
        &self,
        requests: &[SimulationRequest],
    ) -> Result<SimulationOutcome, ScorecardError> {
        let kpis = self.fetch_kpis().await?;
        let by_id: BTreeMap<&str, &Kpi> = kpis.iter().map(|kpi| (kpi.id.as_str(), kpi)).collect();

        let mut entries = Vec::with_capacity(requests.len());
        for request in requests {
            let kpi = by_id
                .get(request.kpi_id.as_str())
                .ok_or_else(|| ScorecardError::KpiNotFound(request.kpi_id.clone()))?;
            entries.push(SimulationEntry {
                kpi_id: kpi.id.clone(),
                kpi_name: kpi.name.clone(),
                current_value: kpi.current_value,
                new_value: request.new_value,
                impact: impact(kpi, request.new_value),
            });
        }

        let total = total_impact(entries.iter().map(|entry| entry.impact));
        Ok(SimulationOutcome { entries, total })
    }

    /// Record a new current value, moving the old one into Previous Value.
    ///
    /// Read-then-patch with no locking: a writer racing between the two
    /// requests can lose an update. Accepted behavior, inherited from the
    /// store's lack of transactions.
    pub async fn update_kpi_value(
        &self,
        kpi_id: &str,
        new_value: f64,
    ) -> Result<(), ScorecardError> {
        let request = ListRequest::table(&self.tables.kpis)
            .with_filter(format!("RECORD_ID() = '{kpi_id}'"));
        let records = fetch_all(self.transport.as_ref(), request, &self.retry).await?;
        let kpi = records
            .first()
            .map(Kpi::decode)
            .ok_or_else(|| ScorecardError::KpiNotFound(kpi_id.to_string()))?;

        let mut patch = Map::new();
        patch.insert("Previous Value".to_string(), Value::from(kpi.current_value));
        patch.insert("Current Value".to_string(), Value::from(new_value));
        self.patch(&self.tables.kpis, kpi_id, patch).await?;
        Ok(())
    }

    pub async fn update_audit_status(
        &self,
        item_id: &str,
        status: AuditStatus,
    ) -> Result<(), ScorecardError> {
        let mut patch = Map::new();
        patch.insert("Status".to_string(), Value::from(status.label()));
        self.patch(&self.tables.audit_items, item_id, patch)
            .await?;
        Ok(())
    }

    pub async fn update_audit_criticality(
        &self,
        item_id: &str,
        criticality: Criticality,
    ) -> Result<(), ScorecardError> {
        let mut patch = Map::new();
        patch.insert("Criticality".to_string(), Value::from(criticality.label()));
        self.patch(&self.tables.audit_items, item_id, patch)
            .await?;
        Ok(())
    }

    pub async fn update_task_status(
        &self,
        table: &str,
        task_id: &str,
        status: AuditStatus,
    ) -> Result<(), ScorecardError> {
        let mut patch = Map::new();
        patch.insert("Status".to_string(), Value::from(status.label()));
        self.patch(table, task_id, patch).await?;
        Ok(())
    }

    async fn patch(
        &self,
        table: &str,
        record_id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), AirtableError> {
        self.retry
            .run(|| self.transport.patch_record(table, record_id, patch.clone()))
            .await
    }
}
