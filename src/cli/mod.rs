//! CLI module for studysite

mod args;

pub use args::{Args, Command, DirArgs};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{self, GenerationReport, HtmlGenerator};
use crate::serve::{self, PreviewServer};
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();
    init_tracing(args.verbose);

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout only carries progress and summaries.
/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "studysite=debug" } else { "studysite=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(args: Args) -> Result<()> {
    let verbose = args.verbose;

    match args.command {
        Command::Build { dirs } => {
            let config = load_config(&args.config, dirs)?;
            build(config, verbose)?;
            Ok(())
        }

        Command::Preview { port, dirs } => {
            let config = load_config(&args.config, dirs)?;
            if !config.output_dir.exists() {
                println!("No site found at {}, building first", config.output_dir.display());
                build(config.clone(), verbose)?;
            }
            preview(&config.output_dir, port)
        }

        Command::Clean { dirs } => {
            let config = load_config(&args.config, dirs)?;
            if output::clean(&config.output_dir)? {
                println!("Removed {}", config.output_dir.display());
            } else {
                println!("Nothing to clean at {}", config.output_dir.display());
            }
            Ok(())
        }
    }
}

/// Load config (creating the default file if missing) and apply CLI overrides
fn load_config(path: &Path, dirs: DirArgs) -> Result<Config> {
    let mut config = Config::load_or_init(path)?;
    config.merge_cli(dirs.data_dir, dirs.template_dir, dirs.output_dir);
    config.validate()?;
    Ok(config)
}

fn build(config: Config, verbose: bool) -> Result<GenerationReport> {
    if verbose {
        println!("Site: {}", config.name);
        println!("Data: {}", config.data_dir.display());
        println!("Templates: {}", config.template_dir.display());
        println!("Output: {}", config.output_dir.display());
    }

    println!("Generating site...");
    let output_dir = config.output_dir.clone();
    let generator = HtmlGenerator::new(config).with_verbose(verbose);
    let report = generator.generate()?;

    if !report.skipped.is_empty() {
        println!("\nSkipped files ({}):", report.skipped.len());
        for skipped in report.skipped.iter().take(10) {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
        if report.skipped.len() > 10 {
            println!("  ... and {} more", report.skipped.len() - 10);
        }
    }

    println!("{}", report.summary());
    println!("Site written to: {}", output_dir.display());
    Ok(report)
}

fn preview(root: &Path, port: u16) -> Result<()> {
    for url in serve::page_urls(root, port)? {
        println!("  {}", url);
    }
    println!("Serving {} on http://localhost:{}", root.display(), port);
    println!("Press Ctrl+C to stop");

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::server(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async {
        let token = CancellationToken::new();
        let mut shutdown = ShutdownSignal::listen();
        let signal = token.clone();
        tokio::spawn(async move {
            let reason = shutdown.recv().await;
            tracing::info!(signal = reason, "shutdown requested");
            signal.cancel();
        });

        PreviewServer::new(root, port).run(token).await
    })
}

/// Process shutdown requests: Ctrl+C, and SIGTERM on unix
struct ShutdownSignal {
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl ShutdownSignal {
    /// Register the handlers. Must be called inside a tokio runtime.
    fn listen() -> Self {
        #[cfg(unix)]
        let terminate = {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(stream) => Some(stream),
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for SIGTERM");
                    None
                }
            }
        };

        Self {
            #[cfg(unix)]
            terminate,
        }
    }

    /// Wait for the first request and name it
    async fn recv(&mut self) -> &'static str {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            () = interrupt => "interrupt",
            () = self.terminated() => "terminate",
        }
    }

    #[cfg(unix)]
    async fn terminated(&mut self) {
        if let Some(stream) = self.terminate.as_mut() {
            if stream.recv().await.is_some() {
                return;
            }
        }
        std::future::pending().await
    }

    #[cfg(not(unix))]
    async fn terminated(&mut self) {
        std::future::pending().await
    }
}
