//! Video metadata via ffprobe.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// Frame geometry and length of a video stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Number of frames; 0 when the container does not say
    pub frame_count: u64,
    pub frame_rate: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Runs ffprobe on the first video stream of `path`.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,nb_frames,r_frame_rate,duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .context("Failed to execute ffprobe. Is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("ffprobe failed for {}: {}", path.display(), stderr.trim()));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parses ffprobe's JSON output.
fn parse_probe_output(json: &str) -> Result<VideoInfo> {
    let probe: ProbeOutput =
        serde_json::from_str(json).context("Failed to parse ffprobe output")?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let width = stream.width.ok_or_else(|| anyhow!("Video stream has no width"))?;
    let height = stream.height.ok_or_else(|| anyhow!("Video stream has no height"))?;
    if width == 0 || height == 0 {
        return Err(anyhow!("Video stream has empty frames ({}x{})", width, height));
    }

    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .unwrap_or(0.0);

    // nb_frames is missing for some containers; estimate from the duration then
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .or_else(|| {
            let duration: f64 = stream.duration.as_deref()?.parse().ok()?;
            Some((duration * frame_rate).round() as u64)
        })
        .unwrap_or(0);

    Ok(VideoInfo {
        width,
        height,
        frame_count,
        frame_rate,
    })
}

/// Parses "30000/1001" style rates.
fn parse_rational(text: &str) -> Option<f64> {
    match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => text.trim().parse().ok(),
    }
}
