//! ROI Digit Reader
//!
//! Extracts a numeric time series from a fixed region of each frame of a
//! video by running OCR restricted to digits, and exports the per-video
//! series as a padded table.

mod batch;
mod cli;
mod config;
mod export;
mod ocr;
mod paths;
mod preview;
mod roi;
mod video;

use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use batch::{bind_rois, BatchContext, BatchSession, LogReporter, StatusReporter};
use cli::{Args, Command, PrepareArgs, ReadArgs};
use config::JobConfig;
use ocr::TesseractEngine;
use video::FfmpegSource;

const LOG_FILE_NAME: &str = "roi_digit_reader.log";

static SESSION_LOG: Mutex<Option<PathBuf>> = Mutex::new(None);

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Logs a message to the console, the log file and the active session log.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    append_line(&paths::get_logs_dir().join(LOG_FILE_NAME), &line);

    if let Ok(session) = SESSION_LOG.lock() {
        if let Some(path) = session.as_ref() {
            append_line(path, &line);
        }
    }
}

/// Mirrors every log line into `path` until called again with `None`.
pub fn set_session_log(path: Option<PathBuf>) {
    if let Ok(mut session) = SESSION_LOG.lock() {
        *session = path;
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprint!("{}", log_msg);
        append_line(&paths::get_logs_dir().join(LOG_FILE_NAME), &log_msg);
    }));
}

/// Loads the job file, or the defaults when there is none yet.
fn load_job_or_default(path: &Path) -> Result<JobConfig> {
    if path.exists() {
        config::load_job(path)
    } else {
        log(&format!("{} not found, using default settings", path.display()));
        Ok(JobConfig::default())
    }
}

fn run_setup(job_path: &Path) -> Result<()> {
    let job = load_job_or_default(job_path)?;
    let tesseract = ocr::ensure_tesseract(&job.ocr)?;
    log(&format!(
        "Ready: {} with tessdata {}",
        tesseract.executable.display(),
        tesseract.tessdata.display()
    ));
    Ok(())
}

fn run_prepare(args: &PrepareArgs) -> Result<()> {
    let job = config::load_job(&args.job)?;
    let out_dir = paths::create_run_dir()?;
    let source = FfmpegSource;

    let written = preview::write_previews(&job, &source, &out_dir)?;
    log(&format!(
        "Wrote {} previews to {}",
        written.len(),
        out_dir.display()
    ));

    let plan = bind_rois(&job, &source, &LogReporter);
    log(&format!(
        "{} videos ready, {} skipped",
        plan.videos.len(),
        plan.skipped.len()
    ));
    Ok(())
}

fn run_read(args: &ReadArgs) -> Result<()> {
    let job = config::load_job(&args.job)?;
    let out_dir = match &args.output {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => paths::create_run_dir()?,
    };

    set_session_log(Some(out_dir.join("session.log")));
    let result = read_into(&job, &out_dir);
    set_session_log(None);
    result
}

fn read_into(job: &JobConfig, out_dir: &Path) -> Result<()> {
    let source = Arc::new(FfmpegSource);
    let reporter: Arc<dyn StatusReporter> = Arc::new(LogReporter);

    let plan = bind_rois(job, source.as_ref(), reporter.as_ref());
    let engine = TesseractEngine::from_settings(&plan.ocr)?;

    let ctx = BatchContext {
        source,
        engine: Arc::new(engine),
        reporter: Arc::clone(&reporter),
    };

    let mut session = BatchSession::new();
    session.start(plan, ctx);
    session.wait();
    let results = session.results()?;

    reporter.report(&format!("Read {} videos:", results.len()));
    reporter.report(&export::format_listing(&results)?);

    let csv_path = out_dir.join("results.csv");
    export::export_to_csv(&results, &csv_path, &job.export.missing_marker)?;
    log(&format!("Saved {}", csv_path.display()));

    let json_path = out_dir.join("results.json");
    export::export_to_json(&results, &json_path)?;
    log(&format!("Saved {}", json_path.display()));

    if job.export.charts {
        let charts = export::render_all_charts(&results, out_dir)?;
        log(&format!("Saved {} charts", charts.len()));
    }

    Ok(())
}

fn main() -> Result<()> {
    install_panic_hook();
    paths::ensure_directories()?;

    let args: Args = argh::from_env();
    match &args.command {
        Command::Setup(setup) => run_setup(&setup.job),
        Command::Prepare(prepare) => run_prepare(prepare),
        Command::Read(read) => run_read(read),
    }
}
