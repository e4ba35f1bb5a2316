use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `ZENTYPE_LOG=debug`
pub const LOG_ENV: &str = "ZENTYPE_LOG";

/// Route `tracing` output to a file; the terminal belongs to the UI.
///
/// Fails if the file cannot be opened or a global subscriber is already
/// installed.
pub fn init(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_log_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("zentype.log");

        init(&path).unwrap();
        tracing::info!("hello from the test");

        assert!(path.exists());

        // only one global subscriber per process
        let err = init(&dir.path().join("again.log")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
