//! KPI scoring: benchmark-normalized per-KPI scores, weighted per-function
//! means, and the global score.
//!
//! The canonical internal scale is 0-100. Conversion to the displayed 0-10
//! scale happens once, at the view boundary, via [`FunctionScore::display_score`]
//! and [`Scores::global_display`].

use crate::domain::Kpi;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct FunctionScore {
    pub function: String,
    /// 0-100.
    pub score: f64,
    pub kpi_count: usize,
}

impl FunctionScore {
    /// 0-10 scale for display.
    pub fn display_score(&self) -> f64 {
        self.score / 10.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Scores {
    pub functions: Vec<FunctionScore>,
    /// 0-100.
    pub global: f64,
}

impl Scores {
    pub fn global_display(&self) -> f64 {
        self.global / 10.0
    }
}

/// Normalize a KPI's current value into 0-100 against its benchmarks:
/// at or below min scores 0, at or above max scores 100, linear in between.
/// Without usable benchmarks the upstream 0-10 final score stands in,
/// scaled to 0-100 and clamped.
pub fn normalized_score(kpi: &Kpi) -> f64 {
    match (kpi.min_benchmark, kpi.max_benchmark) {
        (Some(min), Some(max)) if max > min => {
            if kpi.current_value >= max {
                100.0
            } else if kpi.current_value <= min {
                0.0
            } else {
                100.0 * (kpi.current_value - min) / (max - min)
            }
        }
        _ => (kpi.final_score * 10.0).clamp(0.0, 100.0),
    }
}

/// Weight used in the per-function mean. Unspecified weights decode as 0
/// and count as 1 so an unweighted sheet degrades to a plain mean.
fn scoring_weight(kpi: &Kpi) -> f64 {
    if kpi.impact_weight > 0.0 {
        kpi.impact_weight
    } else {
        1.0
    }
}

/// Weighted mean of normalized KPI scores per business function. A KPI
/// listing several functions contributes to each of them.
pub fn function_scores(kpis: &[Kpi]) -> Vec<FunctionScore> {
    #[derive(Default)]
    struct Accumulator {
        weighted_sum: f64,
        total_weight: f64,
        kpi_count: usize,
    }

    let mut by_function: BTreeMap<String, Accumulator> = BTreeMap::new();
    for kpi in kpis {
        let score = normalized_score(kpi);
        let weight = scoring_weight(kpi);
        for function in &kpi.functions {
            let entry = by_function.entry(function.clone()).or_default();
            entry.weighted_sum += score * weight;
            entry.total_weight += weight;
            entry.kpi_count += 1;
        }
    }

    by_function
        .into_iter()
        .map(|(function, acc)| FunctionScore {
            function,
            score: if acc.total_weight == 0.0 {
                0.0
            } else {
                acc.weighted_sum / acc.total_weight
            },
            kpi_count: acc.kpi_count,
        })
        .collect()
}

/// Unweighted mean of the function means. Deliberately not weighted by KPI
/// count; see DESIGN.md.
pub fn global_score(functions: &[FunctionScore]) -> f64 {
    if functions.is_empty() {
        return 0.0;
    }
    functions.iter().map(|entry| entry.score).sum::<f64>() / functions.len() as f64
}

/// Pure derivation of all displayed scores from the latest KPI list.
pub fn compute_scores(kpis: &[Kpi]) -> Scores {
    let functions = function_scores(kpis);
    let global = global_score(&functions);
    Scores { functions, global }
}
