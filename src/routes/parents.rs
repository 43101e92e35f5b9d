use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;

use crate::db::models::{Parent, ParentDraft, PARENT_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/parents", get(list_parents).post(create_parent))
}

/// Create a parent (admin only). Linked student ids are stored as a JSON
/// array; unknown ids are rejected up front.
async fn create_parent(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<ParentDraft>,
) -> AppResult<Json<Parent>> {
    current.require_role(&[Role::Admin])?;

    if draft.name.trim().is_empty() {
        return Err(AppError::Validation("Parent name must not be empty".into()));
    }
    if draft.phone.trim().is_empty() {
        return Err(AppError::Validation("Phone must not be empty".into()));
    }

    let conn = state.db.get()?;
    for student_id in &draft.student_ids {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM students WHERE id = ?1",
            params![student_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::Validation(format!("Unknown student: {student_id}")));
        }
    }

    let id = uuid::Uuid::now_v7().to_string();
    let student_ids = serde_json::to_string(&draft.student_ids)?;
    conn.execute(
        "INSERT INTO parents (id, user_id, name, phone, email, address, occupation, student_ids) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            draft.user_id,
            draft.name,
            draft.phone,
            draft.email,
            draft.address,
            draft.occupation,
            student_ids,
        ],
    )?;

    let parent = conn.query_row(
        &format!("SELECT {PARENT_COLUMNS} FROM parents WHERE id = ?1"),
        params![id],
        Parent::from_row,
    )?;
    Ok(Json(parent))
}

async fn list_parents(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<Parent>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!("SELECT {PARENT_COLUMNS} FROM parents ORDER BY name"))?;
    let parents = stmt
        .query_map([], Parent::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(parents))
}
