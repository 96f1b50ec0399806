//! Turns an uploaded file into a [`TabularData`].
//!
//! Uploads arrive as data URLs (`data:<mime>;base64,<payload>`) together with
//! the file name the browser reported. The declared extension picks the
//! parser; the payload is decoded fully in memory.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use calamine::{Data, DataType, Reader, Xlsx, open_workbook_from_rs};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::{VizError, VizResult};
use crate::table::{CellValue, PREVIEW_ROWS, TablePreview, TabularData};

lazy_static! {
    static ref DATA_URL_HEADER: Regex = Regex::new(r"^data:[^,]*,").expect("data url regex");
}

/// A file as received from the browser.
///
/// Replaced wholesale on every new upload; never merged or persisted.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UploadedFile {
    #[serde(alias = "filename")]
    pub name: String,
    #[serde(alias = "contents")]
    pub encoded_payload: String,
}

impl UploadedFile {
    /// Wraps raw file bytes (e.g. from a multipart form) into the data URL
    /// form the decoder expects.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        let name = name.into();
        let mime = match declared_extension(&name) {
            "csv" => "text/csv",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            _ => "application/octet-stream",
        };
        let encoded_payload = format!("data:{};base64,{}", mime, STANDARD.encode(bytes));
        UploadedFile {
            name,
            encoded_payload,
        }
    }

    pub fn extension(&self) -> &str {
        declared_extension(&self.name)
    }

    pub fn decode(&self) -> VizResult<TabularData> {
        decode(&self.encoded_payload, self.extension())
    }
}

/// Text after the last `.` of a file name, or the whole name when it has none.
pub fn declared_extension(filename: &str) -> &str {
    filename.rsplit('.').next().unwrap_or(filename)
}

/// Decodes an encoded upload into a table
///
/// # Arguments
/// * `payload` - Data URL or bare base64 text
/// * `declared_extension` - Extension taken from the uploaded file name
///
/// # Returns
/// * `VizResult<TabularData>` - The decoded table, `UnsupportedFormat` for
///   anything that is not csv/xlsx, or `Decode` carrying the parser's message
///
/// # Examples
/// ```
/// use genviz::loader::decode;
///
/// // "a,b\n1,2\n"
/// let table = decode("data:text/csv;base64,YSxiCjEsMgo=", "csv").unwrap();
/// assert_eq!(table.column_names(), vec!["a", "b"]);
/// ```
pub fn decode(payload: &str, declared_extension: &str) -> VizResult<TabularData> {
    // Extension is checked first so unknown formats never hit the parsers
    let format = if declared_extension.ends_with("csv") {
        Format::Csv
    } else if declared_extension.ends_with("xlsx") {
        Format::Xlsx
    } else {
        return Err(VizError::UnsupportedFormat {
            extension: declared_extension.to_string(),
        });
    };

    let bytes = decode_transport(payload)?;
    match format {
        Format::Csv => from_csv_bytes(&bytes),
        Format::Xlsx => from_excel_bytes(bytes),
    }
}

enum Format {
    Csv,
    Xlsx,
}

/// Strips the data URL header and base64-decodes the rest.
pub fn decode_transport(payload: &str) -> VizResult<Vec<u8>> {
    let body = match DATA_URL_HEADER.find(payload) {
        Some(header) => &payload[header.end()..],
        None => payload,
    };
    Ok(STANDARD.decode(body.trim())?)
}

/// Parses UTF-8 comma-separated text; the first record is the header.
pub fn from_csv_bytes(bytes: &[u8]) -> VizResult<TabularData> {
    let text = String::from_utf8(bytes.to_vec())?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    if text.trim().is_empty() {
        return Err(VizError::decode("No columns to parse from file"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::parse).collect());
    }

    TabularData::from_rows(headers, rows)
}

/// Parses an XLSX workbook; only the first sheet is read and its first row
/// is the header.
pub fn from_excel_bytes(bytes: Vec<u8>) -> VizResult<TabularData> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| VizError::decode("No sheets found in Excel file"))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| VizError::decode("Excel sheet is empty"))?
        .iter()
        .map(|cell| cell.to_string())
        .collect();

    let data = rows
        .map(|row| row.iter().map(excel_cell).collect())
        .collect();

    TabularData::from_rows(headers, data)
}

/// What the page shows after an upload: a status line and, on success, the
/// first rows of the table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UploadReport {
    pub status: String,
    pub preview: Option<TablePreview>,
}

impl UploadReport {
    pub const NO_FILE: &'static str = "No file uploaded.";
    pub const UNSUPPORTED: &'static str =
        "Error parsing the file. Ensure the file is a valid CSV or Excel.";

    pub fn no_file() -> Self {
        UploadReport {
            status: Self::NO_FILE.to_string(),
            preview: None,
        }
    }

    /// Builds the report for a decode attempt of `filename`.
    pub fn from_outcome(filename: &str, outcome: Result<&TabularData, &VizError>) -> Self {
        match outcome {
            Ok(table) => UploadReport {
                status: format!(
                    "File successfully uploaded: {} ({} rows, {} columns).",
                    filename,
                    table.row_count(),
                    table.column_count()
                ),
                preview: Some(table.preview(PREVIEW_ROWS)),
            },
            Err(VizError::UnsupportedFormat { .. }) => UploadReport {
                status: Self::UNSUPPORTED.to_string(),
                preview: None,
            },
            Err(e) => UploadReport {
                status: format!("Error processing file: {}", e),
                preview: None,
            },
        }
    }
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Empty),
        Data::Empty => CellValue::Empty,
        other => other
            .as_string()
            .map(CellValue::Text)
            .unwrap_or(CellValue::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnKind;

    fn data_url(text: &str) -> String {
        format!("data:text/csv;base64,{}", STANDARD.encode(text))
    }

    #[test]
    fn extension_is_text_after_last_dot() {
        assert_eq!(declared_extension("report.final.csv"), "csv");
        assert_eq!(declared_extension("csv"), "csv");
        assert_eq!(declared_extension("data.CSV"), "CSV");
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        let err = decode(&data_url("a\n1\n"), "CSV").unwrap_err();
        assert!(matches!(err, VizError::UnsupportedFormat { .. }));
    }

    #[test]
    fn decodes_csv_with_header() {
        let table = decode(&data_url("a,b\n1,2\n"), "csv").unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.row(0).unwrap(), vec![&CellValue::Int(1), &CellValue::Int(2)]);
    }

    #[test]
    fn accepts_bare_base64() {
        let table = decode(&STANDARD.encode("x\nfoo\n"), "csv").unwrap();
        assert_eq!(table.column("x").unwrap().kind, ColumnKind::Textual);
    }

    #[test]
    fn strips_utf8_bom() {
        let table = decode(&data_url("\u{feff}name,v\nq,1\n"), "csv").unwrap();
        assert_eq!(table.column_names(), vec!["name", "v"]);
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let table = decode(&data_url("city,n\n\"Paris, FR\",3\n"), "csv").unwrap();
        assert_eq!(
            table.column("city").unwrap().values[0],
            CellValue::Text("Paris, FR".to_string())
        );
    }

    #[test]
    fn empty_csv_is_a_decode_error() {
        let err = decode(&data_url(""), "csv").unwrap_err();
        assert_eq!(err.to_string(), "No columns to parse from file");
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let payload = format!("data:text/csv;base64,{}", STANDARD.encode([0x61, 0xff, 0xfe]));
        assert!(matches!(decode(&payload, "csv"), Err(VizError::Decode { .. })));
    }

    #[test]
    fn garbage_xlsx_is_a_decode_error() {
        let payload = format!("data:;base64,{}", STANDARD.encode(b"not a zip archive"));
        assert!(matches!(decode(&payload, "xlsx"), Err(VizError::Decode { .. })));
    }

    #[test]
    fn report_counts_rows_and_columns() {
        let table = decode(&data_url("a,b\n1,2\n3,4\n"), "csv").unwrap();
        let report = UploadReport::from_outcome("nums.csv", Ok(&table));
        assert_eq!(
            report.status,
            "File successfully uploaded: nums.csv (2 rows, 2 columns)."
        );
        assert_eq!(report.preview.unwrap().rows.len(), 2);
    }

    #[test]
    fn report_for_failures() {
        let err = decode(&data_url("a\n1\n"), "txt").unwrap_err();
        let report = UploadReport::from_outcome("notes.txt", Err(&err));
        assert_eq!(report.status, UploadReport::UNSUPPORTED);
        assert!(report.preview.is_none());

        let err = VizError::decode("Invalid padding");
        let report = UploadReport::from_outcome("bad.csv", Err(&err));
        assert_eq!(report.status, "Error processing file: Invalid padding");
    }

    #[test]
    fn from_bytes_round_trips_through_decode() {
        let file = UploadedFile::from_bytes("tasks.csv", b"t,n\nx,1\n");
        assert!(file.encoded_payload.starts_with("data:text/csv;base64,"));
        assert_eq!(file.decode().unwrap().column_names(), vec!["t", "n"]);
    }
}
