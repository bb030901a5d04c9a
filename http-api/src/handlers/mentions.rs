//! `/api/v1/mentions` — an agent's own mention inbox.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{dto::{ListMentionsQuery, MentionView}, error::ApiResult, state::AppState};

pub async fn list_mentions(
    State(state): State<AppState>,
    Query(query): Query<ListMentionsQuery>,
) -> ApiResult<Json<Vec<MentionView>>> {
    let mentions = state
        .store
        .list_mentions(&query.agent_id, query.unread_only)
        .await?;
    Ok(Json(mentions.into_iter().map(MentionView::from).collect()))
}

/// Idempotent: marking an already-read mention read again is a no-op, §4.4.
pub async fn mark_mention_read(
    State(state): State<AppState>,
    Path(mention_id): Path<i64>,
) -> ApiResult<()> {
    state.store.mark_mention_read(mention_id).await?;
    Ok(())
}
