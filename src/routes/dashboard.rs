use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;
use serde_json::{Map, Value};

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard/stats", get(stats))
}

/// Dashboard stats; every authenticated role gets its own slice.
/// Roles without a dashboard slice get an empty object, not an error.
async fn stats(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let mut stats = Map::new();

    match current.role {
        Role::Admin => {
            for (key, table) in [
                ("total_students", "students"),
                ("total_teachers", "teachers"),
                ("total_parents", "parents"),
                ("total_classes", "classes"),
                ("total_subjects", "subjects"),
            ] {
                let count: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                stats.insert(key.to_string(), count.into());
            }
        }
        Role::Teacher => {
            let (subjects, classes): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT class_id) FROM subjects \
                 WHERE teacher_id IN (SELECT id FROM teachers WHERE user_id = ?1)",
                params![current.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            stats.insert("my_subjects".to_string(), subjects.into());
            stats.insert("my_classes".to_string(), classes.into());
        }
        Role::Student => {
            let enrollment = conn
                .query_row(
                    "SELECT class_id, section_id FROM students WHERE user_id = ?1",
                    params![current.id],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .ok();
            if let Some((class_id, section_id)) = enrollment {
                stats.insert("my_class".to_string(), class_id.into());
                stats.insert("my_section".to_string(), section_id.into());
            }
        }
        Role::Parent => {
            let student_ids = conn
                .query_row(
                    "SELECT student_ids FROM parents WHERE user_id = ?1",
                    params![current.id],
                    |row| row.get::<_, String>(0),
                )
                .ok();
            if let Some(raw) = student_ids {
                let children = serde_json::from_str::<Vec<String>>(&raw)
                    .map(|ids| ids.len())
                    .unwrap_or(0);
                stats.insert("my_children".to_string(), children.into());
            }
        }
        Role::Accountant | Role::Librarian | Role::Receptionist => {}
    }

    Ok(Json(Value::Object(stats)))
}
