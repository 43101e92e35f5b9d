use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::{params, Connection};
use serde::Deserialize;

use crate::db::models::{Class, ClassDraft, CLASS_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/classes", get(list_classes).post(create_class))
        .route("/api/classes/{class_id}", get(get_class))
}

/// Create a class (admin only). The draft must name an existing school
/// year and only existing sections; the grade numeric is range-checked here
/// on top of the client-side check.
async fn create_class(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<ClassDraft>,
) -> AppResult<Json<Class>> {
    current.require_role(&[Role::Admin])?;
    draft.validate().map_err(AppError::Validation)?;

    let conn = state.db.get()?;

    let year_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM school_years WHERE id = ?1",
        params![draft.school_year_id],
        |row| row.get(0),
    )?;
    if !year_exists {
        return Err(AppError::Validation("Unknown school year".into()));
    }

    for section_id in &draft.sections {
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sections WHERE id = ?1",
            params![section_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::Validation(format!("Unknown section: {section_id}")));
        }
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO classes (id, name, numeric, school_year_id) VALUES (?1, ?2, ?3, ?4)",
        params![id, draft.name, draft.numeric, draft.school_year_id],
    )?;
    for section_id in &draft.sections {
        conn.execute(
            "INSERT OR IGNORE INTO class_sections (class_id, section_id) VALUES (?1, ?2)",
            params![id, section_id],
        )?;
    }

    let mut class = conn.query_row(
        &format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = ?1"),
        params![id],
        Class::from_row,
    )?;
    class.sections = section_ids_for(&conn, &class.id)?;
    Ok(Json(class))
}

#[derive(Debug, Deserialize)]
struct ClassesQuery {
    school_year_id: Option<String>,
}

/// List classes, optionally filtered by school year, ordered by grade numeric.
async fn list_classes(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<ClassesQuery>,
) -> AppResult<Json<Vec<Class>>> {
    let conn = state.db.get()?;
    let mut classes = match query.school_year_id {
        Some(year_id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLASS_COLUMNS} FROM classes WHERE school_year_id = ?1 ORDER BY numeric"
            ))?;
            let rows = stmt.query_map(params![year_id], Class::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {CLASS_COLUMNS} FROM classes ORDER BY numeric"))?;
            let rows = stmt.query_map([], Class::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };

    for class in &mut classes {
        class.sections = section_ids_for(&conn, &class.id)?;
    }
    Ok(Json(classes))
}

async fn get_class(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(class_id): Path<String>,
) -> AppResult<Json<Class>> {
    let conn = state.db.get()?;
    let mut class = conn
        .query_row(
            &format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = ?1"),
            params![class_id],
            Class::from_row,
        )
        .map_err(|_| AppError::NotFound)?;
    class.sections = section_ids_for(&conn, &class.id)?;
    Ok(Json(class))
}

fn section_ids_for(conn: &Connection, class_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT section_id FROM class_sections WHERE class_id = ?1 ORDER BY section_id")?;
    let ids = stmt
        .query_map(params![class_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
