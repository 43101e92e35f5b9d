use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::{params, params_from_iter};
use serde::Deserialize;

use crate::db::models::{Student, StudentDraft, STUDENT_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/students", get(list_students).post(create_student))
        .route(
            "/api/students/{student_id}",
            get(get_student).put(update_student),
        )
}

/// Create a student (admin only). The roll number must be unique within
/// (class, school year).
async fn create_student(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<StudentDraft>,
) -> AppResult<Json<Student>> {
    current.require_role(&[Role::Admin])?;

    if draft.name.trim().is_empty() {
        return Err(AppError::Validation("Student name must not be empty".into()));
    }
    if draft.roll_no.trim().is_empty() {
        return Err(AppError::Validation("Roll number must not be empty".into()));
    }

    let conn = state.db.get()?;

    for (table, id, label) in [
        ("classes", &draft.class_id, "class"),
        ("sections", &draft.section_id, "section"),
        ("school_years", &draft.school_year_id, "school year"),
    ] {
        let exists: bool = conn.query_row(
            &format!("SELECT COUNT(*) > 0 FROM {table} WHERE id = ?1"),
            params![id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::Validation(format!("Unknown {label}")));
        }
    }

    let roll_taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM students \
         WHERE roll_no = ?1 AND class_id = ?2 AND school_year_id = ?3",
        params![draft.roll_no, draft.class_id, draft.school_year_id],
        |row| row.get(0),
    )?;
    if roll_taken {
        return Err(AppError::Validation(
            "Roll number already exists in this class".into(),
        ));
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO students (id, user_id, name, roll_no, class_id, section_id, school_year_id, \
             gender, dob, email, phone, address, photo, guardian_name, guardian_phone, admission_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            id,
            draft.user_id,
            draft.name,
            draft.roll_no,
            draft.class_id,
            draft.section_id,
            draft.school_year_id,
            draft.gender,
            draft.dob,
            draft.email,
            draft.phone,
            draft.address,
            draft.photo,
            draft.guardian_name,
            draft.guardian_phone,
            draft.admission_date,
        ],
    )?;

    let student = conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
        params![id],
        Student::from_row,
    )?;
    Ok(Json(student))
}

#[derive(Debug, Deserialize)]
struct StudentsQuery {
    class_id: Option<String>,
    section_id: Option<String>,
    school_year_id: Option<String>,
}

async fn list_students(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<StudentsQuery>,
) -> AppResult<Json<Vec<Student>>> {
    let mut filters = Vec::new();
    let mut values = Vec::new();
    if let Some(class_id) = query.class_id {
        filters.push("class_id = ?");
        values.push(class_id);
    }
    if let Some(section_id) = query.section_id {
        filters.push("section_id = ?");
        values.push(section_id);
    }
    if let Some(year_id) = query.school_year_id {
        filters.push("school_year_id = ?");
        values.push(year_id);
    }

    let mut sql = format!("SELECT {STUDENT_COLUMNS} FROM students");
    if !filters.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&filters.join(" AND "));
    }
    sql.push_str(" ORDER BY roll_no");

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&sql)?;
    let students = stmt
        .query_map(params_from_iter(values.iter()), Student::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(students))
}

async fn get_student(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(student_id): Path<String>,
) -> AppResult<Json<Student>> {
    let conn = state.db.get()?;
    let student = conn
        .query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
            params![student_id],
            Student::from_row,
        )
        .map_err(|_| AppError::NotFound)?;
    Ok(Json(student))
}

/// Partial update. Enrollment keys (class, section, year, roll) are not
/// movable through this route.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StudentUpdate {
    name: Option<String>,
    gender: Option<crate::db::models::Gender>,
    dob: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    photo: Option<String>,
    guardian_name: Option<String>,
    guardian_phone: Option<String>,
    admission_date: Option<String>,
}

async fn update_student(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(student_id): Path<String>,
    Json(update): Json<StudentUpdate>,
) -> AppResult<Json<Student>> {
    current.require_role(&[Role::Admin, Role::Teacher])?;

    let conn = state.db.get()?;
    let changed = conn.execute(
        "UPDATE students SET \
             name = COALESCE(?2, name), \
             gender = COALESCE(?3, gender), \
             dob = COALESCE(?4, dob), \
             email = COALESCE(?5, email), \
             phone = COALESCE(?6, phone), \
             address = COALESCE(?7, address), \
             photo = COALESCE(?8, photo), \
             guardian_name = COALESCE(?9, guardian_name), \
             guardian_phone = COALESCE(?10, guardian_phone), \
             admission_date = COALESCE(?11, admission_date), \
             updated_at = datetime('now') \
         WHERE id = ?1",
        params![
            student_id,
            update.name,
            update.gender,
            update.dob,
            update.email,
            update.phone,
            update.address,
            update.photo,
            update.guardian_name,
            update.guardian_phone,
            update.admission_date,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound);
    }

    let student = conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
        params![student_id],
        Student::from_row,
    )?;
    Ok(Json(student))
}
