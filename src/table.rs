//! Columnar in-memory table produced by the loader.
//!
//! Every decoded file becomes a [`TabularData`]: named columns in header
//! order, each with an inferred [`ColumnKind`] and one [`CellValue`] per row.

use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::error::{VizError, VizResult};

/// Rows shown in the upload preview
pub const PREVIEW_ROWS: usize = 5;

lazy_static! {
    static ref DATE_SHAPE: Regex =
        Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}([ T]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?)?$")
            .expect("date shape regex");
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%dT%H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

// Text that dataframe readers treat as a missing value
const NA_VALUES: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// A single cell of a decoded table.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
    Empty,
}

impl CellValue {
    /// Interprets a raw CSV field the way a dataframe reader would.
    pub fn parse(raw: &str) -> CellValue {
        let s = raw.trim();
        if NA_VALUES.contains(&s) {
            return CellValue::Empty;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        match s {
            "True" | "TRUE" | "true" => CellValue::Bool(true),
            "False" | "FALSE" | "false" => CellValue::Bool(false),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            CellValue::DateTime(dt) => f.write_str(&format_datetime(dt)),
            CellValue::Empty => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(x) => serializer.serialize_f64(*x),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::DateTime(dt) => serializer.serialize_str(&format_datetime(dt)),
            CellValue::Empty => serializer.serialize_none(),
        }
    }
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.time() == chrono::NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Parses date-looking text, returning `None` for anything else.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if !DATE_SHAPE.is_match(s) {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Inferred type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Textual,
    Boolean,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<CellValue>,
}

impl Column {
    /// Builds a column and infers its kind from the non-empty cells.
    ///
    /// A column whose text cells all look like dates is converted to
    /// `DateTime` cells and typed `Temporal`.
    pub fn infer(name: String, mut values: Vec<CellValue>) -> Column {
        if values.iter().all(CellValue::is_empty) {
            return Column {
                name,
                kind: ColumnKind::Textual,
                values,
            };
        }

        let kind = if values.iter().all(|v| v.is_empty() || v.is_number()) {
            ColumnKind::Numeric
        } else if values
            .iter()
            .all(|v| v.is_empty() || matches!(v, CellValue::Bool(_)))
        {
            ColumnKind::Boolean
        } else if values.iter().all(|v| match v {
            CellValue::Empty | CellValue::DateTime(_) => true,
            CellValue::Text(s) => parse_datetime(s).is_some(),
            _ => false,
        }) {
            for v in values.iter_mut() {
                if let CellValue::Text(s) = v {
                    if let Some(dt) = parse_datetime(s) {
                        *v = CellValue::DateTime(dt);
                    }
                }
            }
            ColumnKind::Temporal
        } else {
            ColumnKind::Textual
        };

        Column { name, kind, values }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    pub fn is_temporal(&self) -> bool {
        self.kind == ColumnKind::Temporal
    }
}

/// Rows × named columns decoded from one upload.
///
/// Always holds at least one column; every column has the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct TabularData {
    columns: Vec<Column>,
    rows: usize,
}

impl TabularData {
    /// Assembles a table from a header row and data rows.
    ///
    /// Short rows are padded with `Empty`. Duplicate header names get a
    /// `.N` suffix and blank ones become `Unnamed: <index>`.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> VizResult<TabularData> {
        if headers.is_empty() {
            return Err(VizError::decode("No columns to parse from file"));
        }

        let names = dedup_headers(headers);
        let width = names.len();
        let row_count = rows.len();

        let mut cells: Vec<Vec<CellValue>> = vec![Vec::with_capacity(row_count); width];
        for (line, row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(VizError::decode(format!(
                    "Error tokenizing data. Expected {} fields in line {}, saw {}",
                    width,
                    line + 2,
                    row.len()
                )));
            }
            let mut row = row.into_iter();
            for column in cells.iter_mut() {
                column.push(row.next().unwrap_or(CellValue::Empty));
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::infer(name, values))
            .collect();

        Ok(TabularData {
            columns,
            rows: row_count,
        })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Cells of row `index` in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&CellValue>> {
        if index >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// First `limit` rows rendered as display strings.
    pub fn preview(&self, limit: usize) -> TablePreview {
        let rows = (0..self.rows.min(limit))
            .filter_map(|i| self.row(i))
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        TablePreview {
            columns: self.column_names(),
            rows,
        }
    }
}

/// Generic table structure handed to the page for the preview grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Renames repeated headers `name`, `name.1`, `name.2`, ... A generated
/// name that is already taken gets suffixed again, so `a,a,a.1` becomes
/// `a, a.1, a.1.1`.
fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(headers.len());

    for (index, header) in headers.into_iter().enumerate() {
        let mut name = if header.trim().is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header
        };

        let mut count = counts.get(&name).copied().unwrap_or(0);
        while count > 0 {
            counts.insert(name.clone(), count + 1);
            name = format!("{}.{}", name, count);
            count = counts.get(&name).copied().unwrap_or(0);
        }
        counts.insert(name.clone(), 1);
        names.push(name);
    }

    names
}
