use anyhow::{Context, Result};
use log::{info, LevelFilter};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Once;
use std::time::{SystemTime, UNIX_EPOCH};

// Ensure the logger is only initialized once per process
static INIT: Once = Once::new();

/// Initialize the logger, writing to a timestamped file in `log_dir` when
/// given and to stderr otherwise. Later calls are no-ops.
pub fn init_logger(log_dir: Option<&Path>, verbose: bool) -> Result<()> {
    let mut result = Ok(());

    INIT.call_once(|| {
        let log_level = if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

        let mut builder = env_logger::Builder::new();
        builder.filter_level(log_level);
        builder.format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

        match log_dir.map(open_log_file).transpose() {
            Ok(Some(file)) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Ok(None) => {
                builder.target(env_logger::Target::Stderr);
            }
            Err(e) => {
                // Fall back to stderr, but still report why
                builder.target(env_logger::Target::Stderr);
                result = Err(e);
            }
        }

        let _ = builder.try_init();
        info!("{} v{} logger initialized at level {:?}", crate::ADDON_NAME, env!("CARGO_PKG_VERSION"), log_level);
    });

    result
}

fn open_log_file(dir: &Path) -> Result<File> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let log_path = dir.join(format!("dlaa_{}.log", timestamp));
    File::create(&log_path).with_context(|| format!("Failed to create log file at {}", log_path.display()))
}
