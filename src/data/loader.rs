use std::collections::BTreeMap;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{normalize_headers, CellValue, Column, Dataset};
use crate::error::DatasetError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Parse an uploaded file into a [`Dataset`]. Dispatch by file-name extension.
///
/// Supported formats:
/// * `.csv` / `.txt` (or no name at all) – comma-delimited text with a header row
/// * `.json`    – `[{ "col": value, ... }, ...]`
/// * `.parquet` – any flat Parquet file
pub fn load_upload(file_name: Option<&str>, bytes: &[u8]) -> Result<Dataset, DatasetError> {
    let ext = file_name
        .and_then(|n| std::path::Path::new(n).extension())
        .and_then(|e| e.to_str())
        .unwrap_or("csv")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => load_csv(bytes),
        "json" => load_json(bytes),
        "parquet" | "pq" => load_parquet(bytes),
        other => Err(DatasetError::UnsupportedFormat(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names, one record per row. Every record must have
/// as many fields as the header.
pub fn load_csv(bytes: &[u8]) -> Result<Dataset, DatasetError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() {
        return Err(DatasetError::Malformed("no columns to parse".into()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(CellValue::parse).collect());
    }

    Dataset::from_rows(&headers, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (the default `to_json(orient='records')` layout):
///
/// ```json
/// [
///   { "sample": "A", "concentration": 1.5 },
///   { "sample": "B", "concentration": 2.0 }
/// ]
/// ```
///
/// Columns are the union of all keys, in key order. Missing keys are nulls.
fn load_json(bytes: &[u8]) -> Result<Dataset, DatasetError> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let records = root
        .as_array()
        .ok_or_else(|| DatasetError::Malformed("expected a top-level JSON array".into()))?;

    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DatasetError::Malformed(format!("row {i} is not a JSON object")))?;
        objects.push(obj);
    }

    let mut columns: BTreeMap<String, Vec<CellValue>> = BTreeMap::new();
    for obj in &objects {
        for key in obj.keys() {
            columns.entry(key.clone()).or_default();
        }
    }
    if columns.is_empty() {
        return Err(DatasetError::Malformed("no columns to parse".into()));
    }

    for obj in &objects {
        for (key, cells) in columns.iter_mut() {
            cells.push(obj.get(key).map(json_to_cell).unwrap_or(CellValue::Null));
        }
    }

    Dataset::new(
        columns
            .into_iter()
            .map(|(name, cells)| Column::new(name, cells))
            .collect(),
    )
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file. Works with files written by both **Pandas**
/// (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(bytes: &[u8]) -> Result<Dataset, DatasetError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))?;
    let raw_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); raw_names.len()];
    for batch_result in reader {
        let batch = batch_result?;
        for (idx, cells) in columns.iter_mut().enumerate() {
            let array = batch.column(idx);
            for row in 0..batch.num_rows() {
                cells.push(extract_cell(array, row)?);
            }
        }
    }

    Dataset::new(
        normalize_headers(&raw_names)
            .into_iter()
            .zip(columns)
            .map(|(name, cells)| Column::new(name, cells))
            .collect(),
    )
}

// -- Parquet / Arrow helpers --

fn primitive<T: ArrowPrimitiveType>(col: &ArrayRef, row: usize) -> Result<T::Native, DatasetError> {
    col.as_primitive_opt::<T>()
        .map(|arr| arr.value(row))
        .ok_or_else(|| DatasetError::Malformed(format!("unexpected array type {:?}", col.data_type())))
}

fn float_cell(v: f64) -> CellValue {
    if v.is_nan() {
        CellValue::Null
    } else {
        CellValue::Float(v)
    }
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> Result<CellValue, DatasetError> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            let text = match col.as_string_opt::<i32>() {
                Some(arr) => arr.value(row).to_string(),
                None => col
                    .as_string_opt::<i64>()
                    .map(|arr| arr.value(row).to_string())
                    .ok_or_else(|| DatasetError::Malformed("unreadable string column".into()))?,
            };
            CellValue::Text(text)
        }
        DataType::Boolean => {
            let arr = col
                .as_boolean_opt()
                .ok_or_else(|| DatasetError::Malformed("unreadable boolean column".into()))?;
            CellValue::Bool(arr.value(row))
        }
        DataType::Int8 => CellValue::Integer(primitive::<Int8Type>(col, row)? as i64),
        DataType::Int16 => CellValue::Integer(primitive::<Int16Type>(col, row)? as i64),
        DataType::Int32 => CellValue::Integer(primitive::<Int32Type>(col, row)? as i64),
        DataType::Int64 => CellValue::Integer(primitive::<Int64Type>(col, row)?),
        DataType::UInt8 => CellValue::Integer(primitive::<UInt8Type>(col, row)? as i64),
        DataType::UInt16 => CellValue::Integer(primitive::<UInt16Type>(col, row)? as i64),
        DataType::UInt32 => CellValue::Integer(primitive::<UInt32Type>(col, row)? as i64),
        DataType::UInt64 => {
            let v = primitive::<UInt64Type>(col, row)?;
            i64::try_from(v)
                .map(CellValue::Integer)
                .unwrap_or(CellValue::Float(v as f64))
        }
        DataType::Float32 => float_cell(primitive::<Float32Type>(col, row)? as f64),
        DataType::Float64 => float_cell(primitive::<Float64Type>(col, row)?),
        // Dates, timestamps, decimals… are kept as their display text.
        _ => CellValue::Text(array_value_to_string(col.as_ref(), row)?),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    #[test]
    fn csv_with_mixed_columns() {
        let data = b"name,value,flag\na,1,true\nb,2.5,false\n,,\n";
        let ds = load_upload(Some("data.csv"), data).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.column_names(), vec!["name", "value", "flag"]);
        assert!(!ds.column("name").unwrap().is_numeric());
        assert_eq!(
            ds.column("value").unwrap().numeric_values(),
            Some(vec![Some(1.0), Some(2.5), None])
        );
        assert!(ds.column("flag").unwrap().is_numeric());
    }

    #[test]
    fn csv_na_tokens_keep_columns_numeric() {
        let ds = load_csv(b"a,b\n1,2\nNA,3\n3,5\n4,4\n").unwrap();
        assert_eq!(
            ds.column("a").unwrap().numeric_values(),
            Some(vec![Some(1.0), None, Some(3.0), Some(4.0)])
        );
        assert_eq!(crate::analysis::correlate(&ds).len(), 1);
    }

    #[test]
    fn csv_strips_byte_order_mark() {
        let ds = load_csv(b"\xEF\xBB\xBFa,b\n1,2\n").unwrap();
        assert_eq!(ds.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn ragged_csv_is_rejected() {
        let err = load_upload(None, b"a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, DatasetError::Csv(_)));
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(matches!(load_csv(b"").unwrap_err(), DatasetError::Malformed(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_upload(Some("table.xlsx"), b"").unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn json_records_fill_missing_keys() {
        let data = br#"[{"a": 1, "b": "x"}, {"a": 2.5}]"#;
        let ds = load_upload(Some("rows.JSON"), data).unwrap();
        assert_eq!(ds.column_names(), vec!["a", "b"]);
        assert_eq!(ds.column("b").unwrap().cells()[1], CellValue::Null);
    }

    #[test]
    fn json_must_be_array_of_objects() {
        assert!(load_json(br#"{"a": 1}"#).is_err());
        assert!(load_json(br#"[1, 2]"#).is_err());
    }

    #[test]
    fn parquet_upload() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("score", DataType::Float64, true),
            Field::new("group", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(Float64Array::from(vec![Some(0.5), None, Some(1.5)])),
                Arc::new(StringArray::from(vec![Some("a"), Some("b"), None])),
            ],
        )
        .unwrap();

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_upload(Some("t.parquet"), &buf).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(
            ds.column("score").unwrap().numeric_values(),
            Some(vec![Some(0.5), None, Some(1.5)])
        );
        assert_eq!(ds.column("group").unwrap().cells()[0], CellValue::Text("a".into()));
        assert!(ds.column("group").unwrap().cells()[2].is_null());
    }
}
