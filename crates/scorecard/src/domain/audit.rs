use crate::airtable::fields::FieldBag;
use crate::airtable::RawRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl AuditStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    pub fn from_field(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" | "done" => Self::Completed,
            "in progress" | "in_progress" => Self::InProgress,
            _ => Self::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Low,
    Medium,
    High,
}

impl Criticality {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn from_field(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// One checklist line. The four path components are free text used as
/// grouping keys by string equality, not foreign keys.
#[derive(Debug, Clone, Serialize)]
pub struct AuditItem {
    pub id: String,
    pub function_name: String,
    pub problem_name: String,
    pub sub_problem_name: String,
    pub category_name: String,
    pub item_name: String,
    pub action_required: String,
    pub status: AuditStatus,
    pub criticality: Criticality,
    pub score: Option<f64>,
    pub comments: Option<String>,
    pub playbook_link: Option<String>,
}

impl AuditItem {
    /// Canonical decode: status defaults to NotStarted, criticality to Low,
    /// strings to empty, score stays absent when undefined.
    pub fn decode(record: &RawRecord) -> Self {
        let bag = FieldBag::new(&record.fields);
        Self {
            id: record.id.clone(),
            function_name: bag.text("Function"),
            problem_name: bag.text("Problem"),
            sub_problem_name: bag.text("Sub Problem"),
            category_name: bag.text("Category"),
            item_name: bag.text("Item"),
            action_required: bag.text("Action Required"),
            status: AuditStatus::from_field(&bag.text("Status")),
            criticality: Criticality::from_field(&bag.text("Criticality")),
            score: bag.opt_number("Score"),
            comments: bag.opt_text("Comments"),
            playbook_link: bag.opt_text("Playbook Link"),
        }
    }

    /// Whether all four grouping components are present. Items without a
    /// full path are excluded from hierarchy construction.
    pub fn has_full_path(&self) -> bool {
        !self.function_name.is_empty()
            && !self.problem_name.is_empty()
            && !self.sub_problem_name.is_empty()
            && !self.category_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: serde_json::Value) -> RawRecord {
        RawRecord {
            id: "recItem001".to_string(),
            fields: fields.as_object().expect("object literal").clone(),
        }
    }

    #[test]
    fn decode_defaults_status_and_criticality() {
        let item = AuditItem::decode(&record(json!({})));
        assert_eq!(item.status, AuditStatus::NotStarted);
        assert_eq!(item.criticality, Criticality::Low);
        assert!(item.score.is_none());
        assert!(item.comments.is_none());
        assert!(!item.has_full_path());
    }

    #[test]
    fn decode_maps_populated_fields() {
        let item = AuditItem::decode(&record(json!({
            "Function": "Marketing",
            "Problem": "Lead Generation",
            "Sub Problem": "Paid Channels",
            "Category": "Attribution",
            "Item": "UTM coverage",
            "Action Required": "Tag all campaigns",
            "Status": "In Progress",
            "Criticality": "High",
            "Score": 6.5,
            "Comments": "Half the campaigns untagged",
            "Playbook Link": "https://playbooks.example/utm",
        })));

        assert!(item.has_full_path());
        assert_eq!(item.status, AuditStatus::InProgress);
        assert_eq!(item.criticality, Criticality::High);
        assert_eq!(item.score, Some(6.5));
        assert_eq!(item.playbook_link.as_deref(), Some("https://playbooks.example/utm"));
    }

    #[test]
    fn unknown_status_text_falls_back_to_not_started() {
        let item = AuditItem::decode(&record(json!({"Status": "Paused"})));
        assert_eq!(item.status, AuditStatus::NotStarted);
    }

    #[test]
    fn blank_path_component_fails_full_path_check() {
        let item = AuditItem::decode(&record(json!({
            "Function": "Marketing",
            "Problem": "P1",
            "Sub Problem": "  ",
            "Category": "C1",
        })));
        assert!(!item.has_full_path());
    }
}
