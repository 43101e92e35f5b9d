pub mod auth;
pub mod classes;
pub mod dashboard;
pub mod parents;
pub mod school_years;
pub mod sections;
pub mod settings;
pub mod students;
pub mod subjects;
pub mod teachers;
pub mod uploads;
pub mod users;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::state::AppState;

/// The full application router. Shared between the binary and the
/// integration tests so both exercise the same surface.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(school_years::router())
        .merge(sections::router())
        .merge(classes::router())
        .merge(subjects::router())
        .merge(teachers::router())
        .merge(students::router())
        .merge(parents::router())
        .merge(settings::router())
        .merge(dashboard::router())
        .merge(uploads::router())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
