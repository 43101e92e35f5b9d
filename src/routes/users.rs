use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{User, USER_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route(
            "/api/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[derive(Debug, Deserialize)]
struct UsersQuery {
    role: Option<Role>,
}

/// List users, optionally filtered by role (admin only).
async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<UsersQuery>,
) -> AppResult<Json<Vec<User>>> {
    current.require_role(&[Role::Admin])?;

    let conn = state.db.get()?;
    let users = match query.role {
        Some(role) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY username"
            ))?;
            let rows = stmt.query_map(params![role], User::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))?;
            let rows = stmt.query_map([], User::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user_id],
            User::from_row,
        )
        .map_err(|_| AppError::NotFound)?;
    Ok(Json(user))
}

/// Partial update. Absent fields keep their stored values; the password is
/// never updatable through this route.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserUpdate {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    photo: Option<String>,
    role: Option<Role>,
    is_active: Option<bool>,
}

/// Update a user, by the user themselves or an admin. Role and activation changes are
/// admin only even on one's own record.
async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    if current.id != user_id && current.role != Role::Admin {
        return Err(AppError::Forbidden);
    }
    if (update.role.is_some() || update.is_active.is_some()) && current.role != Role::Admin {
        return Err(AppError::Forbidden);
    }

    let conn = state.db.get()?;
    let changed = conn.execute(
        "UPDATE users SET \
             name = COALESCE(?2, name), \
             email = COALESCE(?3, email), \
             phone = COALESCE(?4, phone), \
             address = COALESCE(?5, address), \
             photo = COALESCE(?6, photo), \
             role = COALESCE(?7, role), \
             is_active = COALESCE(?8, is_active), \
             updated_at = datetime('now') \
         WHERE id = ?1",
        params![
            user_id,
            update.name,
            update.email,
            update.phone,
            update.address,
            update.photo,
            update.role,
            update.is_active,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound);
    }

    let user = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![user_id],
        User::from_row,
    )?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    current.require_role(&[Role::Admin])?;

    let conn = state.db.get()?;
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
