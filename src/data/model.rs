use std::collections::BTreeSet;
use std::fmt;

use crate::error::DatasetError;

// ---------------------------------------------------------------------------
// CellValue – a single cell of an uploaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes a CSV reader infers.
/// Group keys are kept in ordered collections, so `CellValue` must be `Ord`.
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// Cell texts read as missing, case-sensitive.
pub const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A",
    "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// -- Manual Eq/Ord so we can put CellValue in BTreeSet / BTreeMap --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        // Numbers compare by value regardless of Integer/Float, exactly even
        // beyond 2^53.
        match (self, other) {
            (Integer(a), Integer(b)) => return a.cmp(b),
            (Integer(a), Float(b)) => return cmp_int_float(*a, *b),
            (Float(a), Integer(b)) => return cmp_int_float(*b, *a).reverse(),
            (Float(a), Float(b)) => return a.total_cmp(b),
            _ => {}
        }
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

fn cmp_int_float(i: i64, f: f64) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (i as f64).total_cmp(&f) {
        // `i as f64` rounded onto `f`, so `f` is integral; settle it in integers.
        Ordering::Equal if f >= 9_223_372_036_854_775_808.0 => Ordering::Less,
        Ordering::Equal => i.cmp(&(f as i64)),
        other => other,
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            CellValue::Integer(_) | CellValue::Float(_) => {
                2u8.hash(state);
                self.as_number().unwrap_or(f64::NAN).to_bits().hash(state);
            }
            CellValue::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            CellValue::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            CellValue::Null => 0u8.hash(state),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, ""),
        }
    }
}

impl CellValue {
    /// Infer the type of a raw text cell. Empty cells and the usual
    /// spreadsheet/pandas NA spellings are missing values.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() || MISSING_TOKENS.contains(&raw) {
            return CellValue::Null;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_nan() {
                return CellValue::Null;
            }
            return CellValue::Float(f);
        }
        match raw {
            "true" | "True" | "TRUE" => CellValue::Bool(true),
            "false" | "False" | "FALSE" => CellValue::Bool(false),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    /// Integer or float content, without coercing booleans.
    fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Interpret the value as an `f64`. Booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => other.as_number(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Column – one named column with an inferred kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-missing cell is a number or a boolean.
    Numeric,
    /// At least one non-missing cell is text.
    Categorical,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    cells: Vec<CellValue>,
    kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        let kind = if cells.iter().all(|c| c.is_null() || c.as_f64().is_some()) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        };
        Column {
            name: name.into(),
            cells,
            kind,
        }
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Numeric view of the column (`None` cells are missing values).
    /// Returns `None` for categorical columns.
    pub fn numeric_values(&self) -> Option<Vec<Option<f64>>> {
        if !self.is_numeric() {
            return None;
        }
        Some(self.cells.iter().map(CellValue::as_f64).collect())
    }

    /// Distinct non-missing values in first-appearance order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for cell in &self.cells {
            if cell.is_null() {
                continue;
            }
            if seen.insert(cell.clone()) {
                out.push(cell.to_string());
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete uploaded table
// ---------------------------------------------------------------------------

/// An immutable, column-oriented table. Replaced wholesale on each upload.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset from columns of equal length.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(DatasetError::RaggedColumn {
                column: bad.name.clone(),
                expected: n_rows,
                actual: bad.len(),
            });
        }
        Ok(Dataset { columns, n_rows })
    }

    /// Build a dataset from a header row and row-major cells.
    /// Headers are normalized (see [`normalize_headers`]).
    pub fn from_rows(headers: &[String], rows: Vec<Vec<CellValue>>) -> Result<Self, DatasetError> {
        let names = normalize_headers(headers);
        let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(rows.len()); names.len()];

        for (row_no, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(DatasetError::RowWidth {
                    row: row_no,
                    expected: names.len(),
                    actual: row.len(),
                });
            }
            for (col, cell) in columns.iter_mut().zip(row) {
                col.push(cell);
            }
        }

        Dataset::new(
            names
                .into_iter()
                .zip(columns)
                .map(|(name, cells)| Column::new(name, cells))
                .collect(),
        )
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }
}

/// Blank headers become `Unnamed: <idx>`; repeated headers get `.1`, `.2`, …
pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut out = Vec::with_capacity(headers.len());

    for (idx, raw) in headers.iter().enumerate() {
        let base = if raw.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            raw.clone()
        };
        let mut name = base.clone();
        let mut n = 1;
        while used.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        used.insert(name.clone());
        out.push(name);
    }
    out
}
