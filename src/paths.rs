use chrono::Local;
use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the runs directory: `./runs/`
pub fn get_runs_dir() -> PathBuf {
    PathBuf::from("runs")
}

/// Returns the per-user tessdata directory used for downloaded language files.
pub fn get_user_tessdata_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roi-digit-reader")
        .join("tessdata")
}

/// Creates a timestamped run folder `runs/YYYYMMDD_HHMMSS/` and returns it.
pub fn create_run_dir() -> std::io::Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let dir = get_runs_dir().join(timestamp);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    Ok(())
}
