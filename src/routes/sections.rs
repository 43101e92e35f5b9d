use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;

use crate::db::models::{Section, SectionDraft, SECTION_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/sections", get(list_sections).post(create_section))
}

/// Create a section (admin only). An empty-string capacity in the draft
/// deserializes as absent, never as zero.
async fn create_section(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<SectionDraft>,
) -> AppResult<Json<Section>> {
    current.require_role(&[Role::Admin])?;

    if draft.name.trim().is_empty() {
        return Err(AppError::Validation("Section name must not be empty".into()));
    }
    if draft.capacity == Some(0) {
        return Err(AppError::Validation("Capacity must be a positive number".into()));
    }

    let conn = state.db.get()?;
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO sections (id, name, capacity) VALUES (?1, ?2, ?3)",
        params![id, draft.name, draft.capacity],
    )?;

    let section = conn.query_row(
        &format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = ?1"),
        params![id],
        Section::from_row,
    )?;
    Ok(Json(section))
}

async fn list_sections(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<Section>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!("SELECT {SECTION_COLUMNS} FROM sections ORDER BY name"))?;
    let sections = stmt
        .query_map([], Section::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(sections))
}
