use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use batchfetch::{BatchFetcher, Config, Error, ReportFormat, cancel_on_signal, report, source};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "batchfetch")]
#[command(about = "Fetch a list of resources and their comments with a pool of workers", version)]
struct Cli {
    /// Absolute path to a file of URLs, one per line
    #[arg(long)]
    filename: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'n', long, visible_alias = "nw")]
    workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Cancel the whole batch after this many seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// YAML config file (default: ./configs/config.yaml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Abort in-flight requests on cancellation instead of abandoning them
    #[arg(long)]
    abort_on_cancel: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

impl Cli {
    /// Flags override file and environment settings.
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.filename {
            config.source = Some(path.clone());
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(secs) = self.timeout {
            config.fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.deadline {
            config.deadline = Some(Duration::from_secs(secs));
        }
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if self.abort_on_cancel {
            config.fetch.abort_on_cancel = true;
        }
    }
}

/// Initialize tracing; RUST_LOG wins over the configured level. Logs go to stderr.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {e}");
    }
}

/// Merge defaults, config file, `vars` and flags, then validate the result.
fn resolve_config<I, K, V>(cli: &Cli, vars: I) -> batchfetch::Result<Config>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut config = Config::load_with_env(cli.config.as_deref(), vars)?;
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> batchfetch::Result<()> {
    let config = resolve_config(&cli, std::env::vars())?;

    init_tracing(&config.log_level);

    let source_path = config.source.clone().ok_or_else(|| {
        Error::config("source", "no address list given (use --filename or set 'source')")
    })?;
    let addresses = source::read_addresses(&source_path).await?;

    let format = config.format;
    let fetcher = BatchFetcher::new(config)?;
    let signal_watcher = tokio::spawn(cancel_on_signal(fetcher.cancel_token()));

    let results = fetcher.run(addresses).await;
    signal_watcher.abort();

    print!("{}", report::render(&results?, format)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
