use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::OcrSettings;
use crate::log;
use crate::paths::get_user_tessdata_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

/// Common install locations of the tesseract executable.
const COMMON_EXECUTABLE_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

/// Common tessdata locations.
const COMMON_TESSDATA_PATHS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Finds the Tesseract executable: explicit path first, then PATH, then
/// common install locations.
pub fn find_tesseract_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!(
            "Configured tesseract executable not found: {}",
            path.display()
        ));
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    COMMON_EXECUTABLE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Directories searched for traineddata, in priority order.
fn tessdata_candidates(settings: &OcrSettings) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = &settings.tessdata_dir {
        candidates.push(dir.clone());
    }
    candidates.push(get_user_tessdata_dir());

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    candidates.extend(COMMON_TESSDATA_PATHS.iter().map(PathBuf::from));
    candidates
}

/// Finds a tessdata directory that holds the configured language.
pub fn find_tessdata_dir(settings: &OcrSettings) -> Result<PathBuf> {
    let file_name = traineddata_file_name(&settings.language);

    tessdata_candidates(settings)
        .into_iter()
        .find(|dir| dir.join(&file_name).exists())
        .ok_or_else(|| {
            anyhow!(
                "{} not found in any tessdata directory. Run `setup` or set tessdata_dir.",
                file_name
            )
        })
}

fn traineddata_file_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Ensures Tesseract and the configured language data are available.
/// Downloads the traineddata into the per-user data dir if necessary.
pub fn ensure_tesseract(settings: &OcrSettings) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(settings.tesseract_path.as_deref())?;
    log(&format!("Tesseract found at: {}", executable.display()));

    if let Ok(tessdata) = find_tessdata_dir(settings) {
        log(&format!(
            "{} found in: {}",
            traineddata_file_name(&settings.language),
            tessdata.display()
        ));
        return Ok(TesseractPaths {
            executable,
            tessdata,
        });
    }

    let tessdata = settings
        .tessdata_dir
        .clone()
        .unwrap_or_else(get_user_tessdata_dir);
    fs::create_dir_all(&tessdata)
        .with_context(|| format!("Failed to create {}", tessdata.display()))?;

    let base_url = settings.traineddata_url.as_deref().unwrap_or(TESSDATA_REPO);
    download_traineddata(base_url, &settings.language, &tessdata)?;

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Error text for a failed traineddata download. The stock repository
/// only carries the standard languages, so custom models (such as the
/// seven-segment `sev_seg4`) need their own source.
fn download_failure_message(file_name: &str, base_url: &str, status: &str) -> String {
    let mut msg = format!("Failed to download {}: HTTP {}", file_name, status);
    if base_url == TESSDATA_REPO {
        msg.push_str(&format!(
            ". {} is not a stock Tesseract language: set ocr.traineddata_url to a \
             location that hosts it, or copy it into ocr.tessdata_dir",
            file_name
        ));
    }
    msg
}

/// Downloads `<language>.traineddata` from `base_url` into `tessdata_dir`.
fn download_traineddata(base_url: &str, language: &str, tessdata_dir: &Path) -> Result<()> {
    let file_name = traineddata_file_name(language);
    let url = format!("{}/{}", base_url.trim_end_matches('/'), file_name);
    let target = tessdata_dir.join(&file_name);

    log(&format!("Downloading {} from {}...", file_name, url));

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "roi-digit-reader")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(download_failure_message(
            &file_name,
            base_url,
            &response.status().to_string()
        )));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    file.write_all(&bytes)?;

    log(&format!("Downloaded {} ({} bytes)", file_name, bytes.len()));

    Ok(())
}
