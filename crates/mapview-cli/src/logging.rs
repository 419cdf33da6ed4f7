use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MAX_LOG_SIZE: u64 = 1024 * 1024; // 1MB

/// `--log-file` without a path selects `mapview.log` in the data directory
pub const DEFAULT_LOG_FILE: &str = "-";

/// Default filter when `RUST_LOG` is unset, raised by each `-d`
fn default_filter(debug: u8) -> &'static str {
    match debug {
        0 => "info",
        1 => "info,loader=debug,page=debug,mapview=debug,config=debug",
        _ => "debug",
    }
}

fn env_filter(debug: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(debug)))
}

/// Initialize logging to stderr, and to `log_file` as well when given
///
/// A `log_file` of [`DEFAULT_LOG_FILE`] selects `mapview.log` in the platform data dir.
/// Returns a guard that must be kept alive for the duration of the program.
pub fn init_logging(debug: u8, log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let Some(log_file) = log_file else {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(env_filter(debug))
            .init();
        return Ok(None);
    };

    let log_path = resolve_log_path(log_file)?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    truncate_if_needed(&log_path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(fmt::layer().with_writer(io::stderr).with_ansi(true))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("Logging to file: {}", log_path.display());

    Ok(Some(guard))
}

fn resolve_log_path(log_file: &Path) -> io::Result<PathBuf> {
    if log_file == Path::new(DEFAULT_LOG_FILE) {
        return Ok(get_log_directory()?.join("mapview.log"));
    }
    Ok(log_file.to_path_buf())
}

fn get_log_directory() -> io::Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "mapview")
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Failed to find home directory"))?;

    Ok(proj_dirs.data_dir().join("logs"))
}

fn truncate_if_needed(log_path: &Path) -> io::Result<()> {
    if log_path.exists() && fs::metadata(log_path)?.len() > MAX_LOG_SIZE {
        File::create(log_path)?.set_len(0)?;
    }
    Ok(())
}
