//! `/api/v1/documents` — document publishing (with mention extraction, §4.4)
//! and listing.

use axum::{
    extract::{Query, State},
    Json,
};
use coordinator_core::{
    models::{MentionSourceType, NewDocument},
    notifier::extract_handles,
    validation::require_non_empty,
};

use crate::{
    dto::{CreateDocumentRequest, ListDocumentsQuery},
    error::ApiResult,
    state::AppState,
};

pub async fn create_document(
    State(state): State<AppState>,
    Json(body): Json<CreateDocumentRequest>,
) -> ApiResult<Json<coordinator_core::models::Document>> {
    require_non_empty("title", &body.title)?;
    require_non_empty("body", &body.body)?;

    let document = state
        .store
        .create_document(NewDocument {
            project_id: body.project_id,
            author_agent_id: body.author_agent_id,
            doc_type: body.doc_type,
            title: body.title,
            body: body.body.clone(),
            expires_at: body.expires_at,
        })
        .await?;

    let handles = extract_handles(&body.body);
    if !handles.is_empty() {
        state
            .store
            .create_mentions(
                document.project_id,
                MentionSourceType::Document,
                document.id,
                &handles,
            )
            .await?;
    }

    state.hub.publish(document.project_id);
    Ok(Json(document))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> ApiResult<Json<Vec<coordinator_core::models::Document>>> {
    let documents = state
        .store
        .list_documents(query.project_id, query.doc_type)
        .await?;
    Ok(Json(documents))
}
