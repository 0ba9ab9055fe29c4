//! CSV downloads

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use ssf_common::db::framework::load_export_tree;
use ssf_common::framework::export::{combined_csv_bytes, framework_csv_bytes};

use crate::error::ApiResult;
use crate::AppState;

fn csv_download(prefix: &str, body: Vec<u8>) -> Response {
    let filename = format!("{}-{}.csv", prefix, chrono::Local::now().format("%Y-%m-%d"));
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /api/export/combined.csv: one row per entity of any level
pub async fn export_combined(State(state): State<AppState>) -> ApiResult<Response> {
    let snapshot = load_export_tree(&state.db).await?;
    Ok(csv_download("ssf-combined", combined_csv_bytes(&snapshot)?))
}

/// GET /api/export/framework.csv: wide framework table
pub async fn export_framework(State(state): State<AppState>) -> ApiResult<Response> {
    let snapshot = load_export_tree(&state.db).await?;
    Ok(csv_download("ssf-framework", framework_csv_bytes(&snapshot)?))
}
