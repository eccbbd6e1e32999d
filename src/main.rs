use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logging();
    tabctl::run().await
}

/// Log to a file in the data dir so stdout stays clean for TSV output.
/// `TABCTL_LOG` controls the filter (env-filter syntax).
fn init_logging() -> Option<WorkerGuard> {
    let log_dir = tabctl::project_data_dir();
    let appender = tracing_appender::rolling::never(&log_dir, "tabctl.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env("TABCTL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
