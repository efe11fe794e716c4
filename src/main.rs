//! FPKGi - headless catalog browser entry point

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use fpkgi::app::App;
use fpkgi::constants::*;
use fpkgi::loader::{CatalogLoader, HttpFetcher};
use fpkgi::settings::Settings;
use fpkgi::utils::get_data_dir;
use tracing::{error, info};

/// Initialize file logging. Returns a guard that must be held for the app lifetime.
fn init_logging(data_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, EnvFilter, prelude::*};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "fpkgi.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fpkgi=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    guard
}

fn main() -> fpkgi::Result<()> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // Guard must live for the whole run
    let _log_guard = init_logging(&data_dir);

    info!(version = APP_VERSION, "{} starting", APP_NAME);

    let settings = Settings::load(&data_dir);
    let fetcher = HttpFetcher::new().inspect_err(|e| error!(error = %e, "Failed to build HTTP client"))?;
    let loader = CatalogLoader::new(&data_dir, fetcher);
    let mut app = App::new(settings, loader, data_dir);

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    app.set_search(&query);

    let view = app.view();
    println!("{} - {}", APP_NAME, app.settings().content);
    for row in &view.rows {
        let marker = if row.highlighted { '>' } else { ' ' };
        println!(
            "{} {:<10} {:<4} {:<48} {:>10}",
            marker, row.title_id, row.region, row.title, row.size
        );
    }

    let summary = app.summary();
    println!("{}", summary.count_text());
    if let Some(position) = summary.position_text() {
        println!("{}  (page {}/{})", position, view.page + 1, view.page_count);
    }
    if let Some(selected) = &view.selected {
        println!("Selected: {} [{}]", selected.name, selected.key);
    }

    app.shutdown();
    Ok(())
}
