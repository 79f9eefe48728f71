//! CRUD handlers shared by every simple entity. Each route instantiates them
//! with the entity type, e.g. `get(list::<Customer>)`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::dtos::product::CategoriesResponse;
use crate::dtos::DeleteParams;
use crate::error::AppError;
use crate::models::product::{categories, Product};
use crate::resource::Resource;
use crate::state::AppState;
use crate::views::{delete_row, DeleteOutcome, Editor, ListView};

// GET /{entity}?filter... - Loaded rows narrowed by every given filter field
#[instrument(skip_all, fields(entity = R::LABEL))]
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    Query(filter): Query<R::Filter>,
) -> Result<Json<Vec<R>>, AppError> {
    let mut view = ListView::<R>::new();
    view.load(R::table(state.gateway.as_ref())).await?;
    let rows = view.filtered(&filter).into_iter().cloned().collect();
    Ok(Json(rows))
}

// GET /{entity}/:id
#[instrument(skip(state), fields(entity = R::LABEL))]
pub async fn get_one<R: Resource>(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<R>, AppError> {
    let row = R::table(state.gateway.as_ref())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", R::LABEL)))?;
    Ok(Json(row))
}

// POST /{entity}
#[instrument(skip(state, draft), fields(entity = R::LABEL))]
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    Json(draft): Json<R::Draft>,
) -> Result<(StatusCode, Json<R>), AppError> {
    let mut editor = Editor::<R>::new();
    editor.set_draft(draft);
    let saved = editor.submit(R::table(state.gateway.as_ref())).await?;
    info!(id = saved.id(), "Created");
    Ok((StatusCode::CREATED, Json(saved)))
}

// PUT /{entity}/:id - Whole-form update of an existing row
#[instrument(skip(state, draft), fields(entity = R::LABEL))]
pub async fn update<R: Resource>(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(draft): Json<R::Draft>,
) -> Result<Json<R>, AppError> {
    let table = R::table(state.gateway.as_ref());
    let current = table
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", R::LABEL)))?;

    let mut editor = Editor::<R>::new();
    editor.begin_edit(&current);
    editor.set_draft(draft);
    Ok(Json(editor.submit(table).await?))
}

// DELETE /{entity}/:id?confirm=true
#[instrument(skip(state), fields(entity = R::LABEL))]
pub async fn delete<R: Resource>(
    Path(id): Path<i64>,
    Query(params): Query<DeleteParams>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    match delete_row(R::table(state.gateway.as_ref()), id, &params).await? {
        DeleteOutcome::Deleted => {
            info!(id, "Deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteOutcome::Declined => Err(AppError::validation("Deletion not confirmed")),
    }
}

// GET /products/categories
#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<CategoriesResponse>, AppError> {
    let mut view = ListView::<Product>::new();
    let rows = view.load(state.gateway.products()).await?;
    Ok(Json(CategoriesResponse { categories: categories(rows) }))
}
