use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::{PipelineError, SchemaMismatch};
use super::model::Column;

// ---------------------------------------------------------------------------
// Raw rows – what the file said, typed but not yet validated
// ---------------------------------------------------------------------------

/// One source row before any derivation or imputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListing {
    /// 1-based data row number (header excluded).
    pub source_row: usize,
    pub price: Option<f64>,
    pub model_year: Option<i64>,
    pub model: Option<String>,
    pub condition: Option<String>,
    pub cylinders: Option<f64>,
    pub fuel: Option<String>,
    pub odometer: Option<f64>,
    pub transmission: Option<String>,
    pub vehicle_type: Option<String>,
    pub paint_color: Option<String>,
    pub is_4wd: Option<f64>,
    pub date_posted: Option<String>,
    pub days_listed: Option<i64>,
}

/// Rows plus the set of known columns the file actually carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedListings {
    pub columns: BTreeSet<Column>,
    pub rows: Vec<RawListing>,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load raw listings from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – comma-delimited with a header row
/// * `.tsv`     – tab-delimited with a header row
/// * `.json`    – `[{ "model": "ford f150", "price": 9400, ... }, ...]`
/// * `.parquet` – one column per field, as written by `df.to_parquet()`
pub fn load_listings(path: &Path) -> Result<LoadedListings, PipelineError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(PipelineError::UnsupportedFormat(other.to_string())),
    }
}

fn open(path: &Path) -> Result<File, PipelineError> {
    File::open(path).map_err(|source| PipelineError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Cells – the common currency of all three readers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell<'a> {
    Missing,
    Text(&'a str),
    Number(f64),
    Bool(bool),
}

/// Literals read as missing, following the usual dataframe conventions.
fn is_missing_token(s: &str) -> bool {
    matches!(s, "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL")
}

fn text_cell(cell: Cell<'_>) -> Option<String> {
    match cell {
        Cell::Missing => None,
        Cell::Text(s) if is_missing_token(s.trim()) => None,
        Cell::Text(s) => Some(s.to_string()),
        Cell::Number(n) if n.is_nan() => None,
        Cell::Number(n) => Some(n.to_string()),
        Cell::Bool(b) => Some(b.to_string()),
    }
}

fn number_cell(cell: Cell<'_>, row: usize, column: Column) -> Result<Option<f64>, SchemaMismatch> {
    match cell {
        Cell::Missing => Ok(None),
        Cell::Number(n) if n.is_nan() => Ok(None),
        Cell::Number(n) => Ok(Some(n)),
        Cell::Bool(b) => Ok(Some(if b { 1.0 } else { 0.0 })),
        Cell::Text(s) => {
            let s = s.trim();
            if is_missing_token(s) {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| SchemaMismatch::InvalidValue {
                    row,
                    column: column.name(),
                    expected: "a number",
                    value: s.to_string(),
                })
        }
    }
}

/// Integers may arrive as whole floats (`2011.0`), the way pandas writes
/// integer columns that contain gaps.
fn integer_cell(cell: Cell<'_>, row: usize, column: Column) -> Result<Option<i64>, SchemaMismatch> {
    match number_cell(cell, row, column)? {
        None => Ok(None),
        Some(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
        Some(v) => Err(SchemaMismatch::InvalidValue {
            row,
            column: column.name(),
            expected: "an integer",
            value: v.to_string(),
        }),
    }
}

impl RawListing {
    /// Assemble a row from a per-column cell lookup.
    fn read<'a>(
        source_row: usize,
        mut cell: impl FnMut(Column) -> Result<Cell<'a>, SchemaMismatch>,
    ) -> Result<Self, SchemaMismatch> {
        let row = source_row;
        Ok(RawListing {
            source_row,
            price: number_cell(cell(Column::Price)?, row, Column::Price)?,
            model_year: integer_cell(cell(Column::ModelYear)?, row, Column::ModelYear)?,
            model: text_cell(cell(Column::Model)?),
            condition: text_cell(cell(Column::Condition)?),
            cylinders: number_cell(cell(Column::Cylinders)?, row, Column::Cylinders)?,
            fuel: text_cell(cell(Column::Fuel)?),
            odometer: number_cell(cell(Column::Odometer)?, row, Column::Odometer)?,
            transmission: text_cell(cell(Column::Transmission)?),
            vehicle_type: text_cell(cell(Column::Type)?),
            paint_color: text_cell(cell(Column::PaintColor)?),
            is_4wd: number_cell(cell(Column::Is4wd)?, row, Column::Is4wd)?,
            date_posted: text_cell(cell(Column::DatePosted)?),
            days_listed: integer_cell(cell(Column::DaysListed)?, row, Column::DaysListed)?,
        })
    }
}

/// Map known column names to their position; unknown headers are ignored.
fn index_headers<'h>(
    headers: impl Iterator<Item = &'h str>,
) -> Result<BTreeMap<Column, usize>, SchemaMismatch> {
    let mut positions = BTreeMap::new();
    for (idx, header) in headers.enumerate() {
        if let Some(col) = Column::SOURCE.iter().find(|c| c.name() == header) {
            positions.entry(*col).or_insert(idx);
        }
    }
    check_required(positions.keys().copied())?;
    Ok(positions)
}

fn check_required(present: impl Iterator<Item = Column>) -> Result<(), SchemaMismatch> {
    let present: BTreeSet<Column> = present.collect();
    match Column::REQUIRED.iter().find(|c| !present.contains(c)) {
        Some(missing) => Err(SchemaMismatch::MissingColumn(missing.name())),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// CSV / TSV loader
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path, delimiter: u8) -> Result<LoadedListings, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(open(path)?);

    let headers = reader.headers()?.clone();
    let positions = index_headers(headers.iter())?;

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = RawListing::read(i + 1, |col| {
            Ok(positions
                .get(&col)
                .and_then(|&idx| record.get(idx))
                .map_or(Cell::Missing, Cell::Text))
        })?;
        rows.push(row);
    }

    Ok(LoadedListings {
        columns: positions.into_keys().collect(),
        rows,
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). The set of columns
/// is the union of keys across all records.
fn load_json(path: &Path) -> Result<LoadedListings, PipelineError> {
    let root: JsonValue = serde_json::from_reader(std::io::BufReader::new(open(path)?))?;

    let records = root.as_array().ok_or(SchemaMismatch::InvalidValue {
        row: 0,
        column: "<root>",
        expected: "an array of records",
        value: json_kind(&root).to_string(),
    })?;

    let mut columns = BTreeSet::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let row_no = i + 1;
        let obj = rec.as_object().ok_or_else(|| SchemaMismatch::InvalidValue {
            row: row_no,
            column: "<record>",
            expected: "an object",
            value: json_kind(rec).to_string(),
        })?;

        for col in Column::SOURCE {
            if obj.contains_key(col.name()) {
                columns.insert(col);
            }
        }

        let row = RawListing::read(row_no, |col| match obj.get(col.name()) {
            None | Some(JsonValue::Null) => Ok(Cell::Missing),
            Some(JsonValue::String(s)) => Ok(Cell::Text(s.as_str())),
            Some(JsonValue::Number(n)) => Ok(n.as_f64().map_or(Cell::Missing, Cell::Number)),
            Some(JsonValue::Bool(b)) => Ok(Cell::Bool(*b)),
            Some(other) => Err(SchemaMismatch::InvalidValue {
                row: row_no,
                column: col.name(),
                expected: "a scalar",
                value: json_kind(other).to_string(),
            }),
        })?;
        rows.push(row);
    }

    check_required(columns.iter().copied())?;
    Ok(LoadedListings { columns, rows })
}

fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Numeric fields accept Int32/Int64/Float32/Float64 (and Boolean for
/// `is_4wd`), text fields Utf8/LargeUtf8.
fn load_parquet(path: &Path) -> Result<LoadedListings, PipelineError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;

    // Checked on the file schema so that empty files are validated too.
    let mut positions: BTreeMap<Column, usize> = BTreeMap::new();
    {
        let schema = builder.schema();
        for col in Column::SOURCE {
            if let Ok(idx) = schema.index_of(col.name()) {
                check_arrow_type(col, schema.field(idx).data_type())?;
                positions.insert(col, idx);
            }
        }
    }
    check_required(positions.keys().copied())?;

    let reader = builder.build()?;
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let arrays: BTreeMap<Column, ArrayRef> = positions
            .iter()
            .map(|(&col, &idx)| (col, batch.column(idx).clone()))
            .collect();

        for r in 0..batch.num_rows() {
            let source_row = rows.len() + 1;
            let row = RawListing::read(source_row, |col| {
                Ok(arrays.get(&col).map_or(Cell::Missing, |a| arrow_cell(a, r)))
            })?;
            rows.push(row);
        }
    }

    Ok(LoadedListings {
        columns: positions.into_keys().collect(),
        rows,
    })
}

fn is_text_column(col: Column) -> bool {
    matches!(
        col,
        Column::Model
            | Column::Condition
            | Column::Fuel
            | Column::Transmission
            | Column::Type
            | Column::PaintColor
            | Column::DatePosted
    )
}

fn check_arrow_type(col: Column, dt: &DataType) -> Result<(), SchemaMismatch> {
    let ok = if is_text_column(col) {
        matches!(dt, DataType::Utf8 | DataType::LargeUtf8)
    } else {
        matches!(
            dt,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64
        ) || (col == Column::Is4wd && *dt == DataType::Boolean)
    };
    if ok {
        Ok(())
    } else {
        Err(SchemaMismatch::WrongColumnType {
            column: col.name(),
            found: format!("{dt:?}"),
        })
    }
}

/// Read one value. The array type has already been checked.
fn arrow_cell(col: &ArrayRef, row: usize) -> Cell<'_> {
    if col.is_null(row) {
        return Cell::Missing;
    }
    match col.data_type() {
        DataType::Utf8 => Cell::Text(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => Cell::Text(col.as_string::<i64>().value(row)),
        DataType::Int32 => Cell::Number(col.as_primitive::<Int32Type>().value(row) as f64),
        DataType::Int64 => Cell::Number(col.as_primitive::<Int64Type>().value(row) as f64),
        DataType::Float32 => Cell::Number(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Cell::Number(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Cell::Bool(col.as_boolean().value(row)),
        _ => Cell::Missing,
    }
}
