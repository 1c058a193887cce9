//! Pairwise correlation of dataset columns (Pearson, Kendall tau-b, Spearman).

pub mod coefficients;
pub mod correlation;

pub use correlation::{correlate, CorrelationRecord};
