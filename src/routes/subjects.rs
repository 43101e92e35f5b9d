use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;

use crate::db::models::{Subject, SubjectDraft, SUBJECT_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/subjects", get(list_subjects).post(create_subject))
}

/// Create a subject (admin or teacher). The class must exist; the teacher
/// reference is stored as given, so a teacher deleted later leaves the
/// subject rendering as unassigned rather than failing.
async fn create_subject(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<SubjectDraft>,
) -> AppResult<Json<Subject>> {
    current.require_role(&[Role::Admin, Role::Teacher])?;

    if draft.name.trim().is_empty() {
        return Err(AppError::Validation("Subject name must not be empty".into()));
    }
    if draft.code.trim().is_empty() {
        return Err(AppError::Validation("Subject code must not be empty".into()));
    }

    let conn = state.db.get()?;
    let class_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM classes WHERE id = ?1",
        params![draft.class_id],
        |row| row.get(0),
    )?;
    if !class_exists {
        return Err(AppError::Validation("Unknown class".into()));
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO subjects (id, name, code, class_id, teacher_id, type) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, draft.name, draft.code, draft.class_id, draft.teacher_id, draft.kind],
    )?;

    let subject = conn.query_row(
        &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1"),
        params![id],
        Subject::from_row,
    )?;
    Ok(Json(subject))
}

#[derive(Debug, Deserialize)]
struct SubjectsQuery {
    class_id: Option<String>,
}

async fn list_subjects(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<SubjectsQuery>,
) -> AppResult<Json<Vec<Subject>>> {
    let conn = state.db.get()?;
    let subjects = match query.class_id {
        Some(class_id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE class_id = ?1 ORDER BY name"
            ))?;
            let rows = stmt.query_map(params![class_id], Subject::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY name"))?;
            let rows = stmt.query_map([], Subject::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(Json(subjects))
}
