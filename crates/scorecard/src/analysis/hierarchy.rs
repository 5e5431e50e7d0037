//! Audit checklist roll-up: flat items grouped into the four-level
//! function → problem → sub-problem → category tree.

use crate::domain::{AuditItem, AuditStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Derived aggregate node, rebuilt from scratch on every call to
/// [`build_hierarchy`]. Items sit at category level; every ancestor's
/// metrics cover all items transitively beneath it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HierarchyNode {
    pub items: Vec<AuditItem>,
    pub children: BTreeMap<String, HierarchyNode>,
    pub completion_rate: f64,
    pub average_score: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Rollup {
    total: usize,
    completed: usize,
    score_sum: f64,
    scored: usize,
}

impl Rollup {
    fn absorb_items(&mut self, items: &[AuditItem]) {
        for item in items {
            self.total += 1;
            if item.status == AuditStatus::Completed {
                self.completed += 1;
            }
            if let Some(score) = item.score {
                self.score_sum += score;
                self.scored += 1;
            }
        }
    }

    fn merge(&mut self, other: Rollup) {
        self.total += other.total;
        self.completed += other.completed;
        self.score_sum += other.score_sum;
        self.scored += other.scored;
    }

    fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.completed as f64 / self.total as f64
        }
    }

    fn average_score(&self) -> f64 {
        if self.scored == 0 {
            0.0
        } else {
            self.score_sum / self.scored as f64
        }
    }
}

impl HierarchyNode {
    fn recompute(&mut self) -> Rollup {
        let mut rollup = Rollup::default();
        rollup.absorb_items(&self.items);
        for child in self.children.values_mut() {
            rollup.merge(child.recompute());
        }
        self.completion_rate = rollup.completion_rate();
        self.average_score = rollup.average_score();
        rollup
    }
}

/// Percentage of items with status Completed; 0 for an empty slice.
pub fn completion_rate(items: &[AuditItem]) -> f64 {
    let mut rollup = Rollup::default();
    rollup.absorb_items(items);
    rollup.completion_rate()
}

/// Mean over defined scores only; items without a score contribute to
/// neither numerator nor denominator. 0 when no score is defined.
pub fn average_score(items: &[AuditItem]) -> f64 {
    let mut rollup = Rollup::default();
    rollup.absorb_items(items);
    rollup.average_score()
}

/// Group a flat item list into the four-level tree, keyed by function name
/// at the root. Items missing any path component are skipped, never an
/// error. The build is a pure reduction over the input list.
pub fn build_hierarchy(items: &[AuditItem]) -> BTreeMap<String, HierarchyNode> {
    let mut roots: BTreeMap<String, HierarchyNode> = BTreeMap::new();

    for item in items {
        if !item.has_full_path() {
            warn!(item_id = %item.id, "audit item missing a grouping field, skipped");
            continue;
        }

        let category = roots
            .entry(item.function_name.clone())
            .or_default()
            .children
            .entry(item.problem_name.clone())
            .or_default()
            .children
            .entry(item.sub_problem_name.clone())
            .or_default()
            .children
            .entry(item.category_name.clone())
            .or_default();
        category.items.push(item.clone());
    }

    for node in roots.values_mut() {
        node.recompute();
    }

    roots
}
