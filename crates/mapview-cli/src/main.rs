use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use mapview_client::config::{ConfigError, MapViewConfig};
use mapview_loader::{HttpPage, LoadState, LoaderEvent, ScriptLoader};

mod logging;

#[derive(Parser)]
#[command(version = env!("VERSION_STRING"), about, long_about = None)]
pub struct Cli {
    /// Enables debug mode
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    /// Also write logs to a file (defaults to the data directory)
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = logging::DEFAULT_LOG_FILE)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the SDK script URL for the resolved config
    SdkUrl,
    /// Load a script the way the map would and report whether it became ready
    Probe {
        /// Script URL, defaults to the configured SDK
        url: Option<String>,

        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the resolved config
    Show,
    /// Write an example config file
    Init {
        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file location
    Path,
}

const EXAMPLE_CONFIG: &str = r##"# mapview configuration
# Values can be overridden with WOOSMAP_API_KEY, MAPVIEW_CENTER_LAT,
# MAPVIEW_CENTER_LNG and MAPVIEW_ZOOM.

# api_key = "woos-..."
container_id = "map"
zoom = 12.0

[center]
lat = 37.7749
lng = -122.4194

[stores]
break_point = 14

[stores.default]
color = "#9f2747"
size = 8
min_size = 1

[stores.default.icon]
url = "https://images.woosmap.com/starbucks-marker.svg"
scaled_size = { height = 40, width = 34 }

[stores.default.selected_icon]
url = "https://images.woosmap.com/starbucks-marker-selected.svg"
scaled_size = { height = 50, width = 43 }

# [[stores.rules]]
# type = "drive"
# color = "#2f6f4f"

[info_window]
template = '<div class="store-info"><strong>{{name}}</strong><p>{{address}}</p></div>'
"##;

fn write_example_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists at {}. Edit it manually or pass --force to replace it.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Created example config at {}", path.display());
    Ok(())
}

/// Keep only the last four characters of the API key
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn show_config(config: &MapViewConfig) {
    println!(
        "api_key      = {}",
        config.api_key.as_deref().map(mask_key).unwrap_or_else(|| "(unset)".to_string())
    );
    println!("sdk_url      = {}", config.sdk_url);
    println!("container_id = {}", config.container_id);
    println!("center       = {}, {}", config.center.lat, config.center.lng);
    println!("zoom         = {}", config.zoom);
    println!("break_point  = {}", config.stores.break_point);
    println!("style rules  = {}", config.stores.rules.len());
}

fn describe(event: &LoaderEvent) -> String {
    match event {
        LoaderEvent::Injected { src, handle } => format!("injected {} as {}", src, handle),
        LoaderEvent::Reused { src, handle } => format!("reused {} at {}", src, handle),
        LoaderEvent::Ready { src } => format!("ready {}", src),
        LoaderEvent::Failed { src, failure } => format!("failed {}: {}", src, failure),
        LoaderEvent::Removed { src, handle } => format!("removed {} at {}", src, handle),
    }
}

async fn probe(page: HttpPage, url: &str, timeout: Duration) -> anyhow::Result<()> {
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut loader = ScriptLoader::with_events(page, events_tx);

    let readiness = loader.load(url)?;

    let settled = tokio::time::timeout(timeout, async {
        while let Some(event) = events_rx.recv().await {
            println!("{}", describe(&event));
            if matches!(event, LoaderEvent::Ready { .. } | LoaderEvent::Failed { .. }) {
                break;
            }
        }
    })
    .await;

    if settled.is_err() {
        bail!("{} did not finish loading within {}s", url, timeout.as_secs());
    }

    match readiness.state() {
        LoadState::Ready => Ok(()),
        LoadState::Failed(failure) => bail!("{} failed to load: {}", url, failure),
        LoadState::Loading => bail!("{} is still loading", url),
    }
}

fn resolve_config() -> anyhow::Result<MapViewConfig> {
    MapViewConfig::resolve().context("Failed to load config")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init_logging(cli.debug, cli.log_file.as_deref())
        .context("Failed to initialize logging")?;

    match cli.command {
        Command::Config(ConfigCommand::Show) => {
            show_config(&resolve_config()?);
        }
        Command::Config(ConfigCommand::Init { force }) => {
            let path = MapViewConfig::config_path()?;
            write_example_config(&path, force)?;
            eprintln!("Config file created at: {}", path.display());
        }
        Command::Config(ConfigCommand::Path) => {
            println!("{}", MapViewConfig::config_path()?.display());
        }
        Command::SdkUrl => match resolve_config()?.sdk_script_url() {
            Ok(url) => println!("{}", url),
            Err(ConfigError::MissingApiKey) => {
                bail!("No API key configured. Set api_key in the config file or WOOSMAP_API_KEY.")
            }
            Err(e) => return Err(e.into()),
        },
        Command::Probe { url, timeout_secs } => {
            let url = match url {
                Some(url) => url,
                None => resolve_config()?.sdk_script_url()?,
            };
            info!("Probing {}", url);
            probe(HttpPage::new()?, &url, Duration::from_secs(timeout_secs)).await?;
        }
    }

    Ok(())
}
