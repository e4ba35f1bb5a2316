use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "zentype")
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Log file under $HOME/.local/state/zentype, or the platform data dir
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("zentype");
            Some(state_dir.join("zentype.log"))
        } else {
            Self::project_dirs().map(|dirs| dirs.data_local_dir().join("zentype.log"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_use_app_file_names() {
        if let Some(path) = AppDirs::settings_path() {
            assert!(path.ends_with("settings.json"));
        }
        if let Some(log) = AppDirs::log_path() {
            assert_eq!(log.file_name().unwrap(), "zentype.log");
        }
    }
}
