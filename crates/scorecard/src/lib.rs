//! Business-health scorecard domain library.
//!
//! Reads KPI, audit, and task records from an external tabular record store
//! (Airtable), decodes them once into typed domain records, and derives the
//! dashboard numbers: benchmark-normalized scores, four-level audit roll-ups,
//! and what-if revenue/EBITDA impact projections.

pub mod airtable;
pub mod analysis;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod telemetry;

pub use airtable::{AirtableClient, RecordTransport, RetryPolicy};
pub use analysis::{ImpactResult, Scores};
pub use error::AppError;
pub use service::{ScorecardService, TableNames};
