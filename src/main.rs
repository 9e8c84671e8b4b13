use clap::{Parser, Subcommand};
use photosync::{config, output, sync};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photosync")]
#[command(version)]
#[command(about = "Incremental photo catalog builder")]
#[command(long_about = "\
Incremental photo catalog builder

Turns a tree of year directories into a JSON catalog grouped by year, newest
first, and mirrors originals and thumbnails to an object store. Re-runs only
touch photos whose content changed.

Source structure:

  gallery_images/
  ├── 2024/
  │   ├── DSC_0042.jpg             # Dated by EXIF DateTimeOriginal
  │   └── DSC_2024-05-01_pier.jpg  # ...or by the date in the filename
  └── 2019/
      └── scan.png                 # ...or by the directory: 2019-01-01

Captions (\"alt\") can be edited directly in the catalog; they survive re-runs.

Run 'photosync gen-config' to generate a documented photosync.toml.")]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Source directory (overrides `source_dir`)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Manifest file (overrides `manifest_path`)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process new and changed photos and rewrite the catalog
    Sync {
        /// Reprocess every photo, ignoring content hashes
        #[arg(long)]
        force: bool,
    },
    /// Show what a sync would do without doing it
    Check,
    /// Print a stock photosync.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("photosync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Sync { force } => {
            let config = load_config(&cli)?;
            let pipeline = sync::Pipeline::from_config(&config, force);
            if !pipeline.has_store() {
                info!("no store configured, recording local paths only");
            }
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_sync_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = pipeline.run(Some(tx));
            printer.join().ok();
            output::print_sync_summary(&result?);
        }
        Command::Check => {
            let config = load_config(&cli)?;
            let pipeline = sync::Pipeline::from_config(&config, false);
            println!("==> Checking {}", config.source_dir.display());
            let plan = pipeline.plan()?;
            output::print_plan(&plan);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Resolve the effective config: file over stock defaults, then `.env` and
/// environment for the store, then command-line overrides.
fn load_config(cli: &Cli) -> Result<config::Config, config::ConfigError> {
    if let Some(env_file) = config::load_dotenv() {
        debug!(path = %env_file.display(), "loaded environment file");
    }
    let mut config = config::load_config(&cli.config)?;
    config.apply_env(|name| std::env::var(name).ok());
    if let Some(source) = &cli.source {
        config.source_dir = source.clone();
    }
    if let Some(manifest) = &cli.manifest {
        config.manifest_path = manifest.clone();
    }
    config.validate()?;
    Ok(config)
}
