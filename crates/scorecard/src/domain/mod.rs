//! Typed domain records decoded from raw store field bags.

pub mod audit;
pub mod kpi;
pub mod task;

pub use audit::{AuditItem, AuditStatus, Criticality};
pub use kpi::{ImpactDirection, ImpactType, Kpi, KpiKind};
pub use task::TaskRecord;
