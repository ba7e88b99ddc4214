use boardsync::cli::commands::Cli;
use boardsync::cli::handlers;
use boardsync::io::config_io;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BOARDSYNC_LOG";

/// Log to stderr. `BOARDSYNC_LOG` wins over the board's `[log] filter`.
fn init_tracing(board_dir: Option<&str>) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let configured = handlers::resolve_board_dir(board_dir)
            .ok()
            .and_then(|dir| config_io::read_config(&dir).ok())
            .map(|config| config.log.filter)
            .unwrap_or_else(|| "warn".to_string());
        EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new("warn"))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.board_dir.as_deref());

    if let Err(e) = handlers::dispatch(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
