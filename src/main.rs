use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use installer_lib::core::progress::TracingSink;
use installer_lib::{AppState, InstallRequest, InstallerResult};

#[derive(Parser)]
#[command(name = "syntax-installer", version, about = "Install Syntax clients and studio builds")]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Do not print progress
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installable client years
    Clients,
    /// Print the latest client version
    Version,
    /// Install a client, or only some of its archives
    Install {
        year: String,
        /// Version to install (defaults to the latest)
        #[arg(long)]
        version: Option<String>,
        /// Install only these archives (repeatable)
        #[arg(long = "target")]
        targets: Vec<String>,
    },
    /// List published studio builds
    Studios,
    /// Install the studio build for a year
    Studio { year: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    installer_lib::init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> InstallerResult<()> {
    let mut state = AppState::new(cli.data_dir)?;
    if cli.quiet {
        state.settings.verbose = false;
    }

    match cli.command {
        Commands::Clients => {
            for year in state.catalog.valid_identifiers().await? {
                println!("{year}");
            }
        }
        Commands::Version => {
            println!("{}", state.catalog.latest_version().await?);
        }
        Commands::Install {
            year,
            version,
            targets,
        } => {
            let version = match version {
                Some(version) => version,
                None => state.catalog.latest_version().await?.to_string(),
            };
            let request = InstallRequest {
                year,
                version,
                targets: (!targets.is_empty()).then_some(targets),
            };
            let progress = state.progress(Arc::new(TracingSink));
            state.installer(request, progress)?.install().await?;
        }
        Commands::Studios => {
            let studios = state.studios.available().await?;
            for year in studios.years() {
                println!("{}\t{}", year, studios.url(year).unwrap_or_default());
            }
        }
        Commands::Studio { year } => {
            state.studios.install(&year).await?;
        }
    }

    Ok(())
}
