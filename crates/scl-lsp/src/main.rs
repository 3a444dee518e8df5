use clap::Parser;
use scl_lsp::config::Cli;
use scl_lsp::{Backend, serve};
use std::fs::File;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("scl-lsp: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let config = cli.server_config();
    if !config.enabled {
        tracing::info!("scl-lsp disabled, exiting");
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("starting scl-lsp {}", env!("CARGO_PKG_VERSION"));
    let mut backend = Backend::new(config);

    let result = runtime.block_on(serve(
        &mut backend,
        tokio::io::stdin(),
        tokio::io::stdout(),
    ));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("session terminated: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs to stderr, or to `--log-file` (truncated) when given. Stdout
/// carries the protocol.
fn init_logging(cli: &Cli) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
