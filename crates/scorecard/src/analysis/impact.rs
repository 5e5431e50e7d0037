//! What-if impact model: projected revenue and EBITDA delta from moving a
//! KPI off its current value.

use crate::domain::{ImpactDirection, ImpactType, Kpi};
use serde::Serialize;

/// Projected currency deltas, rounded to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImpactResult {
    pub revenue: i64,
    pub ebitda: i64,
}

/// Impact of moving `kpi` from its current value to `new_value`.
///
/// A current value of zero makes the relative change undefined and counts
/// as zero impact. Rounding happens after each multiplication, on the
/// currency amounts, never on the delta fraction.
pub fn impact(kpi: &Kpi, new_value: f64) -> ImpactResult {
    if kpi.current_value == 0.0 {
        return ImpactResult::default();
    }

    let base = match kpi.impact_type {
        ImpactType::Linear => (new_value - kpi.current_value) / kpi.current_value,
        ImpactType::Exponential => (new_value / kpi.current_value).powi(2) - 1.0,
    };

    let mut delta = base * kpi.impact_weight * kpi.category_weight * kpi.scaling_factor;
    if kpi.impact_direction == ImpactDirection::Inverse {
        delta = -delta;
    }

    let revenue = (kpi.baseline_revenue * delta).round() as i64;
    let ebitda = (revenue as f64 * kpi.ebitda_factor).round() as i64;

    ImpactResult { revenue, ebitda }
}

/// Component-wise sum; an empty iterator sums to zero impact.
pub fn total_impact<I>(results: I) -> ImpactResult
where
    I: IntoIterator<Item = ImpactResult>,
{
    results
        .into_iter()
        .fold(ImpactResult::default(), |acc, item| ImpactResult {
            revenue: acc.revenue + item.revenue,
            ebitda: acc.ebitda + item.ebitda,
        })
}
