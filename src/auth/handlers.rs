use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use rusqlite::params;
use serde_json::json;

use crate::auth::{password, session};
use crate::db::models::{Credentials, Token, User, UserDraft, USER_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::extractors::{bearer_token, CurrentUser};
use crate::state::AppState;

/// Create a login identity.
pub async fn register(
    State(state): State<AppState>,
    Json(draft): Json<UserDraft>,
) -> AppResult<Json<User>> {
    if draft.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if draft.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }

    let conn = state.db.get()?;

    let username_taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![draft.username],
        |row| row.get(0),
    )?;
    if username_taken {
        return Err(AppError::Validation("Username already registered".into()));
    }

    let email_taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
        params![draft.email],
        |row| row.get(0),
    )?;
    if email_taken {
        return Err(AppError::Validation("Email already registered".into()));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let password_hash = password::hash(&draft.password)?;

    conn.execute(
        "INSERT INTO users (id, username, email, name, role, phone, address, photo, password_hash) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            draft.username,
            draft.email,
            draft.name,
            draft.role,
            draft.phone,
            draft.address,
            draft.photo,
            password_hash,
        ],
    )?;

    let user = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        User::from_row,
    )?;

    tracing::info!("Registered user {} ({})", user.username, user.role.as_str());
    Ok(Json(user))
}

/// Verify credentials and mint a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<Token>> {
    let conn = state.db.get()?;

    let found = conn
        .query_row(
            &format!("SELECT password_hash, {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![credentials.username],
            |row| {
                let hash: String = row.get(0)?;
                // User columns start at index 1 here, so re-read by name.
                Ok((
                    hash,
                    User {
                        id: row.get("id")?,
                        username: row.get("username")?,
                        email: row.get("email")?,
                        name: row.get("name")?,
                        role: row.get("role")?,
                        phone: row.get("phone")?,
                        address: row.get("address")?,
                        photo: row.get("photo")?,
                        is_active: row.get("is_active")?,
                        created_at: row.get("created_at")?,
                        updated_at: row.get("updated_at")?,
                    },
                ))
            },
        )
        .ok();

    let Some((hash, user)) = found else {
        return Err(AppError::Unauthenticated);
    };
    if !password::verify(&credentials.password, &hash) {
        return Err(AppError::Unauthenticated);
    }
    if !user.is_active {
        return Err(AppError::Forbidden);
    }

    let access_token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;

    Ok(Json(Token {
        access_token,
        token_type: "bearer".to_string(),
        user,
    }))
}

/// Return the identity behind the presented token.
pub async fn me(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![current.id],
            User::from_row,
        )
        .map_err(|_| AppError::Unauthenticated)?;
    Ok(Json(user))
}

/// Destroy the presented session.
pub async fn logout(
    State(state): State<AppState>,
    _current: CurrentUser,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    if let Some(token) = bearer_token(&headers) {
        session::delete_session(&state.db, token)?;
    }
    Ok(Json(json!({ "message": "Logged out" })))
}
