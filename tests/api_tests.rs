#![cfg(feature = "web")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use genviz::app::{AppState, router};
use genviz::config::ServerConfig;
use genviz::graph::PaletteMode;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const SALES_CSV: &str = "region,month,units\nnorth,2024-01-01,10\nsouth,2024-01-01,7\nnorth,2024-02-01,12\n";

fn app_with(config: ServerConfig) -> Router {
    router(Arc::new(AppState::new(config).expect("template registers")))
}

fn app() -> Router {
    app_with(ServerConfig::default())
}

fn upload_body(filename: &str, text: &str) -> Value {
    json!({
        "filename": filename,
        "contents": format!("data:text/csv;base64,{}", STANDARD.encode(text)),
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("request completes");
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads")
        .to_vec();
    (status, cookie, body)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn json_of(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("json body")
}

/// Uploads `SALES_CSV` and returns the session cookie.
async fn upload_sales(app: &Router) -> String {
    let (status, cookie, body) =
        send(app, post_json("/api/upload", None, &upload_body("sales.csv", SALES_CSV))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_of(&body)["status"],
        "File successfully uploaded: sales.csv (3 rows, 3 columns)."
    );
    cookie.expect("upload sets a session cookie")
}

#[tokio::test]
async fn dashboard_page_lists_choices() {
    let (status, _, body) = send(&app(), get("/", None)).await;
    assert_eq!(status, StatusCode::OK);

    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("<h1>Generative Visualization Model</h1>"));
    assert!(page.contains("Upload File"));
    assert!(page.contains("Gantt Chart"));
    assert!(page.contains("Box Plot"));
    assert!(page.contains("Purples"));
}

#[tokio::test]
async fn options_expose_chart_types_and_palettes() {
    let (status, _, body) = send(&app(), get("/api/options", None)).await;
    assert_eq!(status, StatusCode::OK);

    let options = json_of(&body);
    assert_eq!(options["chart_types"].as_array().unwrap().len(), 8);
    assert_eq!(options["palettes"].as_array().unwrap().len(), 11);
    assert_eq!(options["default_chart_type"], "Bar Chart");
    assert_eq!(options["default_palette"], "Viridis");
}

#[tokio::test]
async fn nothing_uploaded_yet() {
    let app = app();

    let (_, _, body) = send(&app, get("/api/status", None)).await;
    assert_eq!(json_of(&body)["status"], "No file uploaded.");

    let (status, _, _) = send(&app, get("/api/fields?chart_type=Bar%20Chart", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = json!({ "chart_type": "Bar Chart", "palette": "Viridis", "bindings": {} });
    let (status, _, _) = send(&app, post_json("/api/chart", None, &request)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn upload_then_fields_then_chart() {
    let app = app();
    let cookie = upload_sales(&app).await;

    let (_, _, body) = send(&app, get("/api/status", Some(&cookie))).await;
    let report = json_of(&body);
    assert_eq!(report["preview"]["columns"], json!(["region", "month", "units"]));
    assert_eq!(report["preview"]["rows"][0], json!(["north", "2024-01-01", "10"]));

    let (status, _, body) = send(&app, get("/api/fields?chart_type=Heatmap", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    let fields = json_of(&body);
    let ids: Vec<&str> = fields
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["heatmap-x-col", "heatmap-y-col", "heatmap-value-col"]);
    assert_eq!(fields[0]["options"].as_array().unwrap().len(), 3);

    let request = json!({
        "chart_type": "Heatmap",
        "palette": "Magma",
        "bindings": { "x": "month", "y": "region", "value": "units" },
    });
    let (status, _, body) = send(&app, post_json("/api/chart", Some(&cookie), &request)).await;
    assert_eq!(status, StatusCode::OK);
    let chart = json_of(&body);
    assert_eq!(chart["error"], Value::Null);
    assert_eq!(chart["figure"]["data"][0]["type"], "histogram2d");
    assert_eq!(chart["figure"]["data"][0]["histfunc"], "sum");
}

#[tokio::test]
async fn bad_selection_returns_empty_figure() {
    let app = app();
    let cookie = upload_sales(&app).await;

    let request = json!({
        "chart_type": "Bar Chart",
        "palette": "Viridis",
        "bindings": { "x": "region", "y": "profit" },
    });
    let (_, _, body) = send(&app, post_json("/api/chart", Some(&cookie), &request)).await;
    let chart = json_of(&body);
    assert_eq!(chart["figure"], json!({ "data": [], "layout": {} }));
    assert_eq!(chart["error"], "Value of 'profit' is not the name of a column");
}

#[tokio::test]
async fn unsupported_upload_reports_and_empties_form() {
    let app = app();
    let (_, cookie, body) = send(
        &app,
        post_json("/api/upload", None, &upload_body("notes.txt", "hello")),
    )
    .await;
    assert_eq!(
        json_of(&body)["status"],
        "Error parsing the file. Ensure the file is a valid CSV or Excel."
    );

    let cookie = cookie.unwrap();
    let (status, _, body) = send(&app, get("/api/fields?chart_type=Pie%20Chart", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!([]));
}

#[tokio::test]
async fn multipart_upload_is_accepted() {
    let app = app();
    let boundary = "genvizboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"sales.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = boundary,
        csv = SALES_CSV
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload/file")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, cookie, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.is_some());
    assert_eq!(
        json_of(&body)["status"],
        "File successfully uploaded: sales.csv (3 rows, 3 columns)."
    );
}

#[tokio::test]
async fn sessions_do_not_share_uploads() {
    let app = app();
    let first = upload_sales(&app).await;
    let (_, second, _) = send(
        &app,
        post_json("/api/upload", None, &upload_body("other.csv", "x\n1\n")),
    )
    .await;
    let second = second.unwrap();
    assert_ne!(first, second);

    let (_, _, body) = send(&app, get("/api/status", Some(&first))).await;
    assert_eq!(json_of(&body)["preview"]["columns"], json!(["region", "month", "units"]));
    let (_, _, body) = send(&app, get("/api/status", Some(&second))).await;
    assert_eq!(json_of(&body)["preview"]["columns"], json!(["x"]));
}

#[tokio::test]
async fn oldest_session_is_evicted_at_the_cap() {
    let app = app_with(ServerConfig {
        max_sessions: 1,
        ..ServerConfig::default()
    });
    let first = upload_sales(&app).await;
    let second = upload_sales(&app).await;

    let (_, _, body) = send(&app, get("/api/status", Some(&first))).await;
    assert_eq!(json_of(&body)["status"], "No file uploaded.");
    let (_, _, body) = send(&app, get("/api/status", Some(&second))).await;
    assert_eq!(json_of(&body)["preview"]["columns"], json!(["region", "month", "units"]));
}

#[tokio::test(flavor = "current_thread")]
async fn large_upload_decodes_on_a_single_threaded_runtime() {
    let mut text = String::from("id,when,score\n");
    for i in 0..20_000 {
        text.push_str(&format!("{},2024-01-{:02},{}.5\n", i, i % 28 + 1, i % 97));
    }

    let app = app();
    let (status, cookie, body) =
        send(&app, post_json("/api/upload", None, &upload_body("big.csv", &text))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_of(&body)["status"],
        "File successfully uploaded: big.csv (20000 rows, 3 columns)."
    );

    let cookie = cookie.unwrap();
    let request = json!({
        "chart_type": "Scatter Plot",
        "palette": "Cividis",
        "bindings": { "x": "when", "y": "score" },
    });
    let (_, _, body) = send(&app, post_json("/api/chart", Some(&cookie), &request)).await;
    let chart = json_of(&body);
    assert_eq!(chart["error"], Value::Null);
    assert_eq!(chart["figure"]["data"][0]["x"].as_array().unwrap().len(), 20_000);
}

#[tokio::test]
async fn compat_palette_mode_needs_matching_column() {
    let config = ServerConfig {
        palette_mode: PaletteMode::Compat,
        ..ServerConfig::default()
    };
    let app = app_with(config);
    let cookie = upload_sales(&app).await;

    let request = json!({
        "chart_type": "Line Chart",
        "palette": "Viridis",
        "bindings": { "x": "month", "y": "units" },
    });
    let (_, _, body) = send(&app, post_json("/api/chart", Some(&cookie), &request)).await;
    let chart = json_of(&body);
    assert_eq!(chart["figure"]["data"], json!([]));
    assert_eq!(chart["error"], "Value of 'Viridis' is not the name of a column");
}

#[tokio::test]
async fn static_assets_are_served() {
    let (status, _, body) = send(&app(), get("/static/dashboard.css", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains(".drop-zone"));
}
