//! Bulk CSV upload
//!
//! `POST /api/import/:table` with `multipart/form-data` fields `file` (the CSV)
//! and `mode` (`upsert`, the default, or `replace`).

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    Json,
};
use serde::Serialize;
use ssf_common::db::{import_rows, ImportReport};
use ssf_common::framework::import::{parse_import_csv, ImportMode};
use ssf_common::Level;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: ImportReport,
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid upload: {}", e.body_text()))
}

pub async fn import_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let level = Level::from_table_name(&table)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown table: {}", table)))?;

    let mut file = None;
    let mut mode = ImportMode::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        match field.name() {
            Some("file") => file = Some(field.bytes().await.map_err(bad_multipart)?),
            Some("mode") => mode = field.text().await.map_err(bad_multipart)?.parse()?,
            _ => {}
        }
    }

    let data = file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;
    info!(
        "Import upload for {} ({} bytes, mode {})",
        level.table(),
        data.len(),
        mode
    );

    let rows = parse_import_csv(level, &data)?;
    let report = import_rows(&state.db, level, mode, rows).await?;

    Ok(Json(ImportResponse { ok: true, report }))
}
