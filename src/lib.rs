/*!
# genviz

A browser dashboard that turns an uploaded CSV or Excel file into charts.

## Overview

The user drops a `.csv` or `.xlsx` file on the page, sees a status line and a
preview of the first rows, picks one of eight chart types and a color
palette, then maps columns of the file onto the roles the chart needs
(x, y, start date, task, ...). Every change redraws the chart.

## Architecture

### Frontend Layer
- **Technologies**: HTML, JavaScript, plotly.js
- A single handlebars page that talks to the JSON API and hands the
  returned figure to `Plotly.react`

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - File Decoder - data URL → base64 → CSV/XLSX parser → [`TabularData`]
  - Column Introspector - column names, inferred kinds and a row preview
  - Form Generator - one selector per role of the chosen chart type
  - Chart Dispatcher - builds a Plotly figure ([`ChartSpec`]) for the
    selected chart type, columns and palette
  - Session Store - the current upload of each browser, with its decoded table

## Modules

- **error**: [`VizError`] and [`VizResult`]
- **table**: cells, columns and the decoded table
- **loader**: upload decoding and the upload status report
- **forms**: chart types, roles, field selectors and bindings
- **palette**: the eleven named color scales
- **figure**: serializable Plotly figure model
- **graph**: the chart dispatcher
- **config**: server configuration from arguments and `GENVIZ_*` variables
- **session**: per-browser upload state (`web` feature)
- **app**: routing and handlers (`web` feature)

## REST API Endpoints

- `GET /` - Dashboard page
- `GET /api/options` - Chart types and palettes
- `POST /api/upload` - Upload `{filename, contents}` as a data URL
- `POST /api/upload/file` - Upload a multipart `file` field
- `GET /api/status` - Status line and preview of the current upload
- `GET /api/fields?chart_type=...` - Field selectors for a chart type
- `POST /api/chart` - Render `{chart_type, palette, bindings}`
*/

pub mod config;
pub mod error;
pub mod figure;
pub mod forms;
pub mod graph;
pub mod loader;
pub mod palette;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod session;

pub use error::{VizError, VizResult};
pub use figure::ChartSpec;
pub use forms::{ChartType, FieldBindings, FieldSelector, FormOutcome, Role, fields_for, form_for};
pub use graph::{ChartDispatcher, PaletteMode, render};
pub use loader::{UploadReport, UploadedFile, decode};
pub use palette::Palette;
pub use table::{CellValue, Column, ColumnKind, TabularData};
