pub mod aggregate;
pub mod app;
pub mod config;
pub mod errors;
pub mod grid;
pub mod handlers;
pub mod intensity;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;
pub mod ticker;
pub mod timer;
pub mod transfer;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{file_sink, load_data};
pub use store::HabitStore;
