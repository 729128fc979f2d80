use habit_tracker::{AppState, Config, HabitStore, file_sink, load_data, router, ticker};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let data = load_data(&config.data_path).await.restore();
    info!(
        "loaded {} habits from {}",
        data.habits.len(),
        config.data_path.display()
    );
    let mut store = HabitStore::new(data);
    let (sink, writer) = file_sink(config.data_path.clone());
    store.subscribe(sink);
    let state = AppState::new(store);

    // A session persisted by a previous run resumes and catches up first.
    let running = {
        let mut store = state.store.lock().await;
        ticker::refresh(&mut store);
        store.get().timer.is_running()
    };
    ticker::sync(&state, running);

    let app = router(state.clone());
    let addr = config.addr();
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.ticker.cancel();
    state.store.lock().await.unsubscribe_all();
    if let Err(err) = writer.await {
        tracing::error!("state writer stopped abnormally: {err}");
    }
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
