//! Human-readable status reporting for batch runs.
//!
//! Everything reported here is advisory: the duration estimate is derived
//! from probed frame counts and never affects what gets extracted.

/// Receives status text (progress, completion, listings) for display.
pub trait StatusReporter: Send + Sync {
    fn report(&self, text: &str);
}

/// Reporter that writes to the application log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, text: &str) {
        for line in text.lines() {
            crate::log(line);
        }
    }
}

/// Estimated processing time in minutes for `total_frames` frames.
pub fn estimate_minutes(total_frames: u64, seconds_per_frame: f64) -> f64 {
    (total_frames as f64 * seconds_per_frame) / 60.0
}

/// Message shown when a batch starts.
pub fn start_message(video_count: usize, total_frames: u64, seconds_per_frame: f64) -> String {
    format!(
        "Processing {} videos. Estimated time: {:.1} minutes.",
        video_count,
        estimate_minutes(total_frames, seconds_per_frame)
    )
}

/// Formats a duration in seconds to h:mm:ss format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Collects reported lines for assertions.
    #[derive(Default)]
    pub(crate) struct MemoryReporter {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl MemoryReporter {
        pub(crate) fn contains(&self, needle: &str) -> bool {
            self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
        }
    }

    impl StatusReporter for MemoryReporter {
        fn report(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }

    #[test]
    fn test_estimate_minutes() {
        assert_eq!(estimate_minutes(0, 0.5), 0.0);
        assert_eq!(estimate_minutes(240, 0.5), 2.0);
        assert_eq!(estimate_minutes(60, 1.0), 1.0);
    }

    #[test]
    fn test_start_message() {
        assert_eq!(
            start_message(3, 300, 0.5),
            "Processing 3 videos. Estimated time: 2.5 minutes."
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(30.0), "0:30");
        assert_eq!(format_duration(90.0), "1:30");
        assert_eq!(format_duration(3661.0), "1:01:01");
    }
}
