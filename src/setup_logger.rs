use std::path::Path;

use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::build_info::{PROJECT_NAME, PROJECT_VERSION};

const LOG_DIR: &str = "./logs";

/// JSON file log at DEBUG plus a human-readable stdout log at INFO.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the program.
pub async fn setup_logger() -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let app_start_time = chrono::Local::now();
    let log_dir: &Path = Path::new(LOG_DIR);

    if !log_dir.exists()
        && let Err(e) = tokio::fs::create_dir_all(log_dir).await
    {
        anyhow::bail!("Failed to create log directory '{LOG_DIR}': {e}");
    }

    let file_appender = tracing_appender::rolling::never(
        LOG_DIR,
        format!(
            "{}_{}_{}.log",
            PROJECT_NAME,
            PROJECT_VERSION,
            app_start_time.format("%Y%m%d_%H%M%S")
        ),
    );

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(non_blocking)
        .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

    // Written synchronously so log lines stay in order with the menu prompt.
    let stdout_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stdout)
        .with_filter(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
