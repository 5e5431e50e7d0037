use super::audit::{AuditStatus, Criticality};
use crate::airtable::fields::FieldBag;
use crate::airtable::RawRecord;
use chrono::NaiveDate;
use serde::Serialize;

/// Generalized task record backing both the action-item and project-plan
/// tables; the two differ only in which optional columns are populated.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub description: String,
    pub function: String,
    pub status: AuditStatus,
    pub priority: Criticality,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub due_date: Option<NaiveDate>,
}

impl TaskRecord {
    pub fn decode(record: &RawRecord) -> Self {
        let bag = FieldBag::new(&record.fields);
        Self {
            id: record.id.clone(),
            description: bag.text("Task"),
            function: bag.text("Function"),
            status: AuditStatus::from_field(&bag.text("Status")),
            priority: Criticality::from_field(&bag.text("Priority")),
            estimated_hours: bag.number("Estimated Hours"),
            actual_hours: bag.number("Actual Hours"),
            due_date: bag
                .opt_text("Due Date")
                .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()),
        }
    }
}
