use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;

use crate::db::models::{Teacher, TeacherDraft, TEACHER_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/teachers", get(list_teachers).post(create_teacher))
        .route("/api/teachers/{teacher_id}", get(get_teacher))
}

/// Create a teacher (admin only). The draft may carry a user_id from a
/// one-shot seed; the stored record is independent of that user afterward.
async fn create_teacher(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<TeacherDraft>,
) -> AppResult<Json<Teacher>> {
    current.require_role(&[Role::Admin])?;

    if draft.name.trim().is_empty() {
        return Err(AppError::Validation("Teacher name must not be empty".into()));
    }

    let conn = state.db.get()?;
    if let Some(user_id) = &draft.user_id {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::Validation("Unknown user".into()));
        }
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO teachers (id, user_id, name, designation, qualification, gender, dob, \
             joining_date, phone, email, address, photo, salary) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            id,
            draft.user_id,
            draft.name,
            draft.designation,
            draft.qualification,
            draft.gender,
            draft.dob,
            draft.joining_date,
            draft.phone,
            draft.email,
            draft.address,
            draft.photo,
            draft.salary,
        ],
    )?;

    let teacher = conn.query_row(
        &format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE id = ?1"),
        params![id],
        Teacher::from_row,
    )?;
    Ok(Json(teacher))
}

async fn list_teachers(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<Teacher>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!("SELECT {TEACHER_COLUMNS} FROM teachers ORDER BY name"))?;
    let teachers = stmt
        .query_map([], Teacher::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(teachers))
}

async fn get_teacher(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(teacher_id): Path<String>,
) -> AppResult<Json<Teacher>> {
    let conn = state.db.get()?;
    let teacher = conn
        .query_row(
            &format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE id = ?1"),
            params![teacher_id],
            Teacher::from_row,
        )
        .map_err(|_| AppError::NotFound)?;
    Ok(Json(teacher))
}
