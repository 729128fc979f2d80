use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/habits", post(handlers::create_habit_form))
        .route("/habits/:id/log", post(handlers::log_entry_form))
        .route("/habits/:id/delete", post(handlers::delete_habit_form))
        .route("/timer/:command", post(handlers::timer_command_form))
        .route(
            "/api/habits",
            get(handlers::list_habits).post(handlers::create_habit),
        )
        .route(
            "/api/habits/:id",
            get(handlers::get_habit)
                .patch(handlers::update_habit)
                .delete(handlers::delete_habit),
        )
        .route("/api/habits/:id/entries", post(handlers::add_entry))
        .route(
            "/api/habits/:id/entries/:date",
            put(handlers::edit_entry).delete(handlers::delete_entry),
        )
        .route("/api/habits/:id/history", get(handlers::get_history))
        .route("/api/habits/:id/grid", get(handlers::get_grid))
        .route("/api/timer", get(handlers::get_timer))
        .route("/api/timer/target", put(handlers::set_timer_target))
        .route("/api/timer/:command", post(handlers::timer_command))
        .route("/api/preferences", put(handlers::update_preferences))
        .route("/api/export", get(handlers::export_data))
        .route("/api/import", post(handlers::import_data))
        .with_state(state)
}
