use crate::airtable::fields::FieldBag;
use crate::airtable::RawRecord;
use serde::{Deserialize, Serialize};

/// Historical labels in the store are French ("Principal"/"Secondaire");
/// both spellings decode to the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiKind {
    Input,
    Output,
}

impl KpiKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Output => "Output",
        }
    }

    fn from_field(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "secondaire" | "output" => Self::Output,
            _ => Self::Input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactType {
    Linear,
    Exponential,
}

impl ImpactType {
    fn from_field(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exponential" | "exponentiel" => Self::Exponential,
            _ => Self::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactDirection {
    Direct,
    Inverse,
}

impl ImpactDirection {
    fn from_field(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inverse" => Self::Inverse,
            _ => Self::Direct,
        }
    }
}

/// A tracked business metric with scoring bounds and impact-model parameters.
#[derive(Debug, Clone, Serialize)]
pub struct Kpi {
    pub id: String,
    pub name: String,
    pub kind: KpiKind,
    pub current_value: f64,
    pub previous_value: Option<f64>,
    /// 0-10 scale, computed upstream in most paths.
    pub final_score: f64,
    pub status: String,
    pub functions: Vec<String>,
    pub impact_weight: f64,
    pub category_weight: f64,
    pub scaling_factor: f64,
    pub impact_type: ImpactType,
    pub impact_direction: ImpactDirection,
    pub baseline_revenue: f64,
    pub ebitda_factor: f64,
    pub min_benchmark: Option<f64>,
    pub max_benchmark: Option<f64>,
}

impl Kpi {
    /// Canonical decode: every field defaulted exactly once.
    pub fn decode(record: &RawRecord) -> Self {
        let bag = FieldBag::new(&record.fields);
        Self {
            id: record.id.clone(),
            name: bag.text("Name"),
            kind: KpiKind::from_field(&bag.text("Type")),
            current_value: bag.number("Current Value"),
            previous_value: bag.opt_number("Previous Value"),
            final_score: bag.number("Final Score"),
            status: bag.text("Status"),
            functions: bag.name_list("Functions"),
            impact_weight: bag.number("Impact Weight"),
            category_weight: bag.number("Category Weight"),
            scaling_factor: bag.number("Scaling Factor"),
            impact_type: ImpactType::from_field(&bag.text("Impact Type")),
            impact_direction: ImpactDirection::from_field(&bag.text("Impact Direction")),
            baseline_revenue: bag.number("Baseline Revenue"),
            ebitda_factor: bag.number("EBITDA Factor"),
            min_benchmark: bag.opt_number("Min Benchmark"),
            max_benchmark: bag.opt_number("Max Benchmark"),
        }
    }
}
