use crate::store::HabitStore;
use crate::ticker::Ticker;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<HabitStore>>,
    pub ticker: Arc<Ticker>,
}

impl AppState {
    pub fn new(store: HabitStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            ticker: Arc::new(Ticker::default()),
        }
    }
}
