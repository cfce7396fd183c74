use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// The solve database under `$HOME/.local/state/kubik`, falling back
    /// to the platform data dir when HOME is unset.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("kubik");
            Some(state_dir.join("solves.db"))
        } else {
            ProjectDirs::from("", "", "kubik")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("solves.db"))
        }
    }
}
