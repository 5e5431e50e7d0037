//! Derived computations over fetched records: impact modelling, audit
//! hierarchy roll-ups, and KPI scoring.

pub mod hierarchy;
pub mod impact;
pub mod scoring;

pub use hierarchy::{build_hierarchy, HierarchyNode};
pub use impact::{impact, total_impact, ImpactResult};
pub use scoring::{compute_scores, FunctionScore, Scores};
