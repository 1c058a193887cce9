use std::collections::BTreeMap;

use super::model::{CellValue, Column};
use crate::error::PlotError;

// ---------------------------------------------------------------------------
// Group-by aggregation used by the bar chart kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Sum of the non-missing y values in each group.
    Sum,
    /// Number of non-missing y values in each group.
    Count,
}

impl Aggregation {
    fn label(self) -> &'static str {
        match self {
            Aggregation::Sum => "bar-sum",
            Aggregation::Count => "bar-count",
        }
    }
}

/// One bar: a distinct x value and its aggregated y.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: CellValue,
    pub value: f64,
}

/// Group rows by the distinct non-missing values of `x`, aggregate `y` per
/// group, and order the groups by descending aggregate.
///
/// Groups start in key order, and the descending sort is stable, so equal
/// aggregates stay in key order.
pub fn group_by(x: &Column, y: &Column, aggregation: Aggregation) -> Result<Vec<Group>, PlotError> {
    let y_values: Vec<Option<f64>> = match aggregation {
        Aggregation::Sum => y.numeric_values().ok_or_else(|| PlotError::NonNumericColumn {
            column: y.name.clone(),
            kind: aggregation.label(),
        })?,
        // Counting works on any column: only presence matters.
        Aggregation::Count => y
            .cells()
            .iter()
            .map(|c| if c.is_null() { None } else { Some(1.0) })
            .collect(),
    };

    let mut totals: BTreeMap<CellValue, f64> = BTreeMap::new();
    for (key, y_val) in x.cells().iter().zip(y_values) {
        if key.is_null() {
            continue;
        }
        let slot = totals.entry(key.clone()).or_insert(0.0);
        if let Some(v) = y_val {
            *slot += match aggregation {
                Aggregation::Sum => v,
                Aggregation::Count => 1.0,
            };
        }
    }

    let mut groups: Vec<Group> = totals
        .into_iter()
        .map(|(key, value)| Group { key, value })
        .collect();
    groups.sort_by(|a, b| b.value.total_cmp(&a.value));
    Ok(groups)
}
