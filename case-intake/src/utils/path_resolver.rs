use anyhow::Result;
use std::path::{Path, PathBuf};

pub const LOG_FOLDER_NAME: &str = "Intake_Logs";

/// Resolve the folder holding the running executable (absolute path)
pub fn resolve_executable_folder() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return dir.to_path_buf();
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve log folder (absolute path)
///
/// Order: an existing `Intake_Logs/` found walking up from the working directory, then the
/// user's local data directory, then next to the executable.
pub fn resolve_log_folder() -> Result<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(found) = find_existing_log_folder(&cwd) {
            return Ok(found);
        }
    }

    let base = dirs::data_local_dir()
        .map(|d| d.join("case-intake"))
        .unwrap_or_else(resolve_executable_folder);
    let log_dir = base.join(LOG_FOLDER_NAME);
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder {:?}: {}", log_dir, e))?;
    Ok(log_dir)
}

fn find_existing_log_folder(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(12)
        .map(|dir| dir.join(LOG_FOLDER_NAME))
        .find(|candidate| candidate.is_dir())
}
