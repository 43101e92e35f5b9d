use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;

use crate::db::models::{Settings, SettingsDraft, SETTINGS_COLUMNS};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::policy::Role;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).post(save_settings))
}

/// Save settings (admin only). The settings record is a singleton and
/// is replaced whole on every write.
async fn save_settings(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<SettingsDraft>,
) -> AppResult<Json<Settings>> {
    current.require_role(&[Role::Admin])?;

    let conn = state.db.get()?;
    conn.execute("DELETE FROM settings", [])?;

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO settings (id, school_name, school_code, address, phone, email, \
             currency, currency_symbol, timezone, language) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            draft.school_name,
            draft.school_code,
            draft.address,
            draft.phone,
            draft.email,
            draft.currency,
            draft.currency_symbol,
            draft.timezone,
            draft.language,
        ],
    )?;

    let settings = conn.query_row(
        &format!("SELECT {SETTINGS_COLUMNS} FROM settings WHERE id = ?1"),
        params![id],
        Settings::from_row,
    )?;
    Ok(Json(settings))
}

/// Read settings, no authentication required. Falls back to defaults when nothing has been
/// saved yet, so the login screen can always render a school name.
async fn get_settings(State(state): State<AppState>) -> AppResult<Json<Settings>> {
    let conn = state.db.get()?;
    let settings = conn
        .query_row(
            &format!("SELECT {SETTINGS_COLUMNS} FROM settings"),
            [],
            Settings::from_row,
        )
        .unwrap_or_else(|_| Settings {
            id: "default".to_string(),
            school_name: "School Management System".to_string(),
            school_code: None,
            address: None,
            phone: None,
            email: None,
            currency: "USD".to_string(),
            currency_symbol: "$".to_string(),
            timezone: "UTC".to_string(),
            language: "en".to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        });
    Ok(Json(settings))
}
