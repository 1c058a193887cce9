use serde::Serialize;

use super::coefficients::{complete_pairs, kendall, pearson, spearman};
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// CorrelationRecord – one row of the ranked correlation table
// ---------------------------------------------------------------------------

/// Coefficients for one unordered pair of distinct columns.
///
/// Serialized with the `col1,col2,pearson,kendall,spearman` header; an
/// absent coefficient becomes an empty field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationRecord {
    #[serde(rename = "col1")]
    pub column_a: String,
    #[serde(rename = "col2")]
    pub column_b: String,
    pub pearson: Option<f64>,
    pub kendall: Option<f64>,
    pub spearman: Option<f64>,
}

impl CorrelationRecord {
    /// Largest absolute value among the present coefficients.
    pub fn strength(&self) -> f64 {
        [self.pearson, self.kendall, self.spearman]
            .into_iter()
            .flatten()
            .map(f64::abs)
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Correlation engine
// ---------------------------------------------------------------------------

/// Rank every unordered pair of distinct columns by correlation strength.
///
/// Pairs are enumerated as `(columns[i], columns[j])` for `j` in `0..=i`.
/// Records without a Pearson value (non-numeric columns, fewer than two
/// complete rows, zero variance) are dropped, as are self-pairs. The rest
/// are stably sorted by descending [`CorrelationRecord::strength`], so ties
/// keep enumeration order.
pub fn correlate(dataset: &Dataset) -> Vec<CorrelationRecord> {
    let columns = dataset.columns();
    let numeric: Vec<Option<Vec<Option<f64>>>> =
        columns.iter().map(|c| c.numeric_values()).collect();

    let mut records = Vec::new();
    for i in 0..columns.len() {
        for j in 0..=i {
            // self-pairs never reach the output
            if i == j {
                continue;
            }
            let (pearson, kendall, spearman) = match (&numeric[i], &numeric[j]) {
                (Some(a), Some(b)) => {
                    let (x, y) = complete_pairs(a, b);
                    (pearson(&x, &y), kendall(&x, &y), spearman(&x, &y))
                }
                _ => (None, None, None),
            };
            if pearson.is_none() {
                continue;
            }
            records.push(CorrelationRecord {
                column_a: columns[i].name.clone(),
                column_b: columns[j].name.clone(),
                pearson,
                kendall,
                spearman,
            });
        }
    }

    records.sort_by(|a, b| b.strength().total_cmp(&a.strength()));
    log::debug!(
        "correlated {} columns into {} ranked pairs",
        columns.len(),
        records.len()
    );
    records
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::data::model::{CellValue, Column};

    fn numeric(name: &str, values: &[f64]) -> Column {
        Column::new(name, values.iter().map(|&v| CellValue::Float(v)).collect())
    }

    fn dataset() -> Dataset {
        Dataset::new(vec![
            numeric("x", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            numeric("y", &[2.0, 1.0, 4.0, 3.0, 5.0]),
            Column::new(
                "label",
                ["a", "b", "c", "d", "e"]
                    .iter()
                    .map(|s| CellValue::Text(s.to_string()))
                    .collect(),
            ),
            numeric("z", &[5.0, 4.0, 3.0, 2.0, 1.0]),
            numeric("flat", &[7.0; 5]),
        ])
        .unwrap()
    }

    #[test]
    fn no_self_pairs_and_no_duplicates() {
        let records = correlate(&dataset());
        let mut seen = BTreeSet::new();
        for r in &records {
            assert_ne!(r.column_a, r.column_b);
            let key = if r.column_a < r.column_b {
                (r.column_a.clone(), r.column_b.clone())
            } else {
                (r.column_b.clone(), r.column_a.clone())
            };
            assert!(seen.insert(key), "duplicate pair {r:?}");
        }
        // x, y, z are the only columns with a defined Pearson value
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn sorted_by_descending_strength() {
        let records = correlate(&dataset());
        for pair in records.windows(2) {
            assert!(pair[0].strength() >= pair[1].strength());
        }
        // z is the exact reverse of x
        assert_eq!(records[0].column_a, "z");
        assert_eq!(records[0].column_b, "x");
        assert!((records[0].pearson.unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_enumeration_order() {
        let ds = Dataset::new(vec![
            numeric("a", &[1.0, 2.0, 3.0]),
            numeric("b", &[1.0, 2.0, 3.0]),
            numeric("c", &[1.0, 2.0, 3.0]),
        ])
        .unwrap();
        let pairs: Vec<(String, String)> = correlate(&ds)
            .into_iter()
            .map(|r| (r.column_a, r.column_b))
            .collect();
        let expected = [("b", "a"), ("c", "a"), ("c", "b")];
        assert_eq!(
            pairs,
            expected
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn single_column_yields_nothing() {
        let ds = Dataset::new(vec![numeric("only", &[1.0, 2.0, 3.0])]).unwrap();
        assert!(correlate(&ds).is_empty());
    }

    #[test]
    fn single_row_yields_nothing() {
        let ds = Dataset::new(vec![numeric("a", &[1.0]), numeric("b", &[2.0])]).unwrap();
        assert!(correlate(&ds).is_empty());
    }

    #[test]
    fn missing_cells_use_complete_rows() {
        let ds = Dataset::new(vec![
            Column::new(
                "a",
                vec![CellValue::Integer(1), CellValue::Null, CellValue::Integer(3), CellValue::Integer(4)],
            ),
            Column::new(
                "b",
                vec![CellValue::Integer(2), CellValue::Integer(9), CellValue::Integer(6), CellValue::Integer(8)],
            ),
        ])
        .unwrap();
        let records = correlate(&ds);
        assert_eq!(records.len(), 1);
        assert!((records[0].pearson.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn strength_ignores_absent_coefficients() {
        let record = CorrelationRecord {
            column_a: "a".into(),
            column_b: "b".into(),
            pearson: Some(-0.3),
            kendall: None,
            spearman: Some(0.2),
        };
        assert!((record.strength() - 0.3).abs() < 1e-12);
    }
}
