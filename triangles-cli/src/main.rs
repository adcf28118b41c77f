use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use triangles_cli::config::Settings;
use triangles_cli::pipeline::{Collaborators, Pipeline};
use triangles_cli::progress::MiningProgress;
use triangles_cli::scheduler::{run_scheduled, run_single};
use triangles_cli::version_banner;
use triangles_core::{CancellationToken, Keys, encode_reference};

#[derive(Parser, Debug)]
#[command(name = "triangles")]
#[command(about = "Post abstract renderings of photos to Nostr relays", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Post now, then on every posting interval
    Run {
        /// TOML configuration file; environment variables override it
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Post once and exit
        #[arg(long)]
        once: bool,

        /// Show debug logging
        #[arg(short, long)]
        verbose: bool,

        /// Disable the mining spinner
        #[arg(long)]
        no_progress: bool,

        /// Start even when no relays are configured
        #[arg(long)]
        allow_no_relays: bool,
    },

    /// Generate a new secret key
    Keygen,

    /// Encode a record identifier and relay hints as a shareable reference
    Reference {
        /// Record identifier (64 hex characters)
        #[arg(value_name = "ID")]
        id: String,

        /// Relay hints, in order
        #[arg(value_name = "RELAY")]
        relays: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            once,
            verbose,
            no_progress,
            allow_no_relays,
        } => {
            init_logging(verbose);
            info!("Starting {}", version_banner());

            let settings = Settings::load(config.as_deref())?;
            settings.validate(allow_no_relays)?;
            if settings.relay_urls.is_empty() {
                warn!("No relays configured; records will not be published");
            }
            info!("Settings: {:?}", settings);

            let collaborators = Collaborators::production(&settings)?;
            let period = settings.posting_interval;
            let pipeline = Pipeline::new(settings, collaborators)?
                .with_progress(MiningProgress::new(!no_progress));
            info!("Posting as {}", pipeline.keys().npub()?);

            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown requested");
                    signal_token.cancel();
                }
            });

            if once {
                run_single(&pipeline, shutdown).await?;
            } else {
                run_scheduled(&pipeline, period, shutdown).await;
            }
        }
        Commands::Keygen => {
            let keys = Keys::generate();
            println!("secret key: {}", keys.secret_hex());
            println!("nsec:       {}", keys.nsec()?);
            println!("public key: {}", keys.public_key());
            println!("npub:       {}", keys.npub()?);
        }
        Commands::Reference { id, relays } => {
            let reference = encode_reference(&id, relays.as_slice())
                .with_context(|| format!("Failed to encode reference for {}", id))?;
            println!("{}", reference);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
