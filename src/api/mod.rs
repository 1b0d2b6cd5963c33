//! HTTP surface: one handler family per entity, all sharing [`AppState`].

pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;

use handlers::{academics, backup, courses, rewards, scores, statistics, students};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::core::health))
        .route("/setup/demo", post(handlers::core::setup_demo))
        .route(
            "/academics",
            get(academics::list)
                .post(academics::create)
                .put(academics::update)
                .delete(academics::delete),
        )
        .route("/academics/:type/:id", get(academics::get))
        .route("/students", get(students::list).post(students::create))
        .route(
            "/students/:id",
            get(students::get)
                .put(students::update)
                .delete(students::delete),
        )
        .route("/students/:id/summary", get(students::summary))
        .route("/students/:id/transcript", get(students::transcript))
        .route("/courses", get(courses::list).post(courses::create))
        .route(
            "/courses/:course_id",
            get(courses::get)
                .put(courses::update)
                .delete(courses::delete),
        )
        .route("/scores", get(scores::list).post(scores::create))
        .route(
            "/scores/:student_id/:course_id",
            get(scores::get).put(scores::update).delete(scores::delete),
        )
        .route(
            "/rewards-punishments",
            get(rewards::list)
                .post(rewards::create)
                .delete(rewards::delete_by_query),
        )
        .route(
            "/rewards-punishments/:rp_id",
            get(rewards::get)
                .put(rewards::update)
                .delete(rewards::delete),
        )
        .route("/statistics", get(statistics::report))
        .route(
            "/backup",
            get(backup::list).post(backup::run).delete(backup::delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
