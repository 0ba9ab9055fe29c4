//! Framework tree endpoints
//!
//! The editor works on the pillar → theme → sub-theme tree: it loads the tree,
//! previews edits through `recalculate` (pure, nothing stored) and finally
//! saves the whole tree with `PUT /api/framework/tree`.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use ssf_common::db::framework::{load_grouped_standards, load_tree, save_tree};
use ssf_common::db::StandardRow;
use ssf_common::framework::grouping::PillarGroup;
use ssf_common::framework::tree::apply_edits;
use ssf_common::framework::{
    dirty_entries, recalc_ref_codes, DirtyEntry, FrameworkTree, TreeEdit,
};
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecalculateRequest {
    pub tree: FrameworkTree,
    /// Structural edits applied in order before recalculating
    #[serde(default)]
    pub edits: Vec<TreeEdit>,
}

#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub tree: FrameworkTree,
    /// Every node with its current and recalculated code
    pub nodes: Vec<DirtyEntry>,
    /// Number of nodes whose code changes
    pub dirty: usize,
}

/// GET /api/framework/tree
pub async fn get_tree(State(state): State<AppState>) -> ApiResult<Json<FrameworkTree>> {
    Ok(Json(load_tree(&state.db).await?))
}

/// POST /api/framework/recalculate
pub async fn recalculate(
    Json(request): Json<RecalculateRequest>,
) -> ApiResult<Json<RecalculateResponse>> {
    let edited = apply_edits(&request.tree, &request.edits)?;
    let nodes = dirty_entries(&edited);
    let dirty = nodes.iter().filter(|n| n.dirty).count();
    debug!(
        "Recalculated tree after {} edits: {} of {} codes change",
        request.edits.len(),
        dirty,
        nodes.len()
    );

    Ok(Json(RecalculateResponse {
        tree: recalc_ref_codes(&edited),
        nodes,
        dirty,
    }))
}

/// PUT /api/framework/tree: renumber and persist the submitted tree
pub async fn put_tree(
    State(state): State<AppState>,
    Json(tree): Json<FrameworkTree>,
) -> ApiResult<Json<FrameworkTree>> {
    let renumbered = recalc_ref_codes(&tree);
    let saved = save_tree(&state.db, &renumbered).await?;
    info!("Framework tree saved ({} pillars)", saved.pillars.len());
    Ok(Json(saved))
}

/// GET /api/framework/standards: standards grouped by pillar, theme, sub-theme
pub async fn grouped_standards(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PillarGroup<StandardRow>>>> {
    Ok(Json(load_grouped_standards(&state.db).await?))
}

pub fn framework_routes() -> Router<AppState> {
    Router::new()
        .route("/api/framework/tree", get(get_tree).put(put_tree))
        .route("/api/framework/recalculate", post(recalculate))
        .route("/api/framework/standards", get(grouped_standards))
}
