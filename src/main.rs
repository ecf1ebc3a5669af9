use std::process::ExitCode;
use std::sync::Arc;

use todo_core::{AppError, Config};
use todo_services::{Scheduler, SqliteTaskStore, TaskClient, WeatherRefreshJob};
use todo_weather::WeatherProvider;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "todo-app exited with an error");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let once = std::env::args().skip(1).any(|arg| arg == "--once");

    let config = Config::load()?;
    todo_core::init(&config.logging.level)?;

    config.ensure_valid()?;

    if let Some(parent) = config.storage.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SqliteTaskStore::new(&config.storage.database_path)?;
    let tasks = TaskClient::sqlite(store);

    let provider = WeatherProvider::from_config(&config.weather)?;

    let job = WeatherRefreshJob::new(tasks, Arc::new(provider))
        .with_max_concurrent(config.weather.max_concurrent_fetches);

    if once {
        let report = job.run().await?;
        tracing::info!(
            total = report.total,
            updated = report.updated,
            failed = report.failed,
            "Single weather refresh complete"
        );
        return Ok(());
    }

    let mut scheduler = Scheduler::new();
    scheduler.register(config.weather.refresh_interval(), Arc::new(job));

    let shutdown = CancellationToken::new();
    let handle = scheduler.start(shutdown);
    tracing::info!(
        database = %config.storage.database_path.display(),
        "todo-app started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    handle.stop().await;

    Ok(())
}
