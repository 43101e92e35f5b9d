use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;

use crate::db::models::{SchoolYear, SchoolYearDraft, SCHOOL_YEAR_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/school-years",
            get(list_school_years).post(create_school_year),
        )
        .route("/api/school-years/current", get(current_school_year))
}

/// Create a school year (admin only). At most one year is current:
/// marking a new one current clears the flag everywhere else first.
async fn create_school_year(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<SchoolYearDraft>,
) -> AppResult<Json<SchoolYear>> {
    current.require_role(&[Role::Admin])?;

    if draft.year.trim().is_empty() {
        return Err(AppError::Validation("Year label must not be empty".into()));
    }

    let conn = state.db.get()?;
    if draft.is_current {
        conn.execute("UPDATE school_years SET is_current = 0", [])?;
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO school_years (id, year, start_date, end_date, is_current) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, draft.year, draft.start_date, draft.end_date, draft.is_current],
    )?;

    let year = conn.query_row(
        &format!("SELECT {SCHOOL_YEAR_COLUMNS} FROM school_years WHERE id = ?1"),
        params![id],
        SchoolYear::from_row,
    )?;
    Ok(Json(year))
}

async fn list_school_years(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<SchoolYear>>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {SCHOOL_YEAR_COLUMNS} FROM school_years ORDER BY start_date DESC"
    ))?;
    let years = stmt
        .query_map([], SchoolYear::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(years))
}

async fn current_school_year(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<SchoolYear>> {
    let conn = state.db.get()?;
    let year = conn
        .query_row(
            &format!("SELECT {SCHOOL_YEAR_COLUMNS} FROM school_years WHERE is_current = 1"),
            [],
            SchoolYear::from_row,
        )
        .map_err(|_| AppError::NotFound)?;
    Ok(Json(year))
}
