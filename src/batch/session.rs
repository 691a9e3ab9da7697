//! Batch session: runs extraction on a background thread and owns the
//! result set it produces.
//!
//! State machine: `Idle -> Running -> Idle`. Starting while a run is in
//! progress is ignored. The result set is replaced as a whole when a run
//! finishes and cannot be read while a run is in progress.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::builder::{run_batch, ResultSet};
use super::plan::BatchPlan;
use super::progress::StatusReporter;
use crate::ocr::OcrEngine;
use crate::video::FrameSource;

/// Batch run state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
}

/// Collaborators a batch run calls into.
#[derive(Clone)]
pub struct BatchContext {
    pub source: Arc<dyn FrameSource>,
    pub engine: Arc<dyn OcrEngine>,
    pub reporter: Arc<dyn StatusReporter>,
}

/// Clears the running flag when the worker ends, even by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the latest result set and at most one running batch.
pub struct BatchSession {
    running: Arc<AtomicBool>,
    results: Arc<Mutex<Option<ResultSet>>>,
    worker: Option<JoinHandle<()>>,
}

impl Default for BatchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchSession {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            results: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    pub fn state(&self) -> BatchState {
        if self.running.load(Ordering::SeqCst) {
            BatchState::Running
        } else {
            BatchState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == BatchState::Running
    }

    /// Starts a batch run in a background thread.
    ///
    /// Returns immediately. Returns `false` without doing anything if a run
    /// is already in progress.
    pub fn start(&mut self, plan: BatchPlan, ctx: BatchContext) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            crate::log("Batch already running, start request ignored");
            return false;
        }

        // Reap the previous worker, which has already cleared the flag
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }

        // The previous set is gone as soon as a new run starts, even if
        // that run dies before storing its own
        match self.results.lock() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }

        let guard = RunningGuard(Arc::clone(&self.running));
        let results = Arc::clone(&self.results);

        self.worker = Some(thread::spawn(move || {
            let _guard = guard;
            let run = run_batch(
                &plan,
                ctx.source.as_ref(),
                ctx.engine.as_ref(),
                ctx.reporter.as_ref(),
            );

            let fresh = match run {
                Ok(fresh) => fresh,
                Err(e) => {
                    ctx.reporter.report(&format!("Batch failed to start: {}", e));
                    ResultSet::new()
                }
            };

            // Whole-set replacement; earlier entries never survive a new run
            match results.lock() {
                Ok(mut slot) => *slot = Some(fresh),
                Err(poisoned) => *poisoned.into_inner() = Some(fresh),
            }
            crate::log("Batch thread finished");
        }));

        true
    }

    /// Blocks until the current run, if any, has finished.
    pub fn wait(&mut self) {
        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.join() {
                crate::log(&format!("Batch thread panicked: {:?}", e));
            }
        }
    }

    /// Returns a copy of the latest result set.
    ///
    /// Fails while a run is in progress and when no run has produced any
    /// series yet.
    pub fn results(&self) -> Result<ResultSet> {
        if self.is_running() {
            return Err(anyhow!("Batch is still running. Wait for it to finish."));
        }

        let slot = self
            .results
            .lock()
            .map_err(|_| anyhow!("Result set lock poisoned"))?;

        match slot.as_ref() {
            Some(results) if !results.is_empty() => Ok(results.clone()),
            _ => Err(anyhow!("No OCR results. Run a batch first.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::plan::bind_rois;
    use crate::batch::progress::tests::MemoryReporter;
    use crate::batch::tests::{FakeSource, GrayLevelEngine};
    use crate::config::{JobConfig, RoiSpec, VideoEntry};
    use crate::ocr::engine::OcrFragment;
    use image::RgbImage;
    use std::path::Path;
    use std::sync::mpsc::{channel, Receiver, Sender};

    fn video(path: &str, include: bool) -> VideoEntry {
        VideoEntry {
            include,
            roi: Some(RoiSpec::Rect {
                x: 0.0,
                y: 0.0,
                width: 8.0,
                height: 8.0,
            }),
            ..VideoEntry::new(path)
        }
    }

    fn context(source: FakeSource) -> (BatchContext, Arc<MemoryReporter>) {
        let reporter = Arc::new(MemoryReporter::default());
        let ctx = BatchContext {
            source: Arc::new(source),
            engine: Arc::new(GrayLevelEngine { confidence: 90.0 }),
            reporter: reporter.clone(),
        };
        (ctx, reporter)
    }

    fn plan_for(job: &JobConfig, ctx: &BatchContext) -> BatchPlan {
        bind_rois(job, ctx.source.as_ref(), ctx.reporter.as_ref())
    }

    fn source() -> FakeSource {
        FakeSource::new(16, 16)
            .with_video("a.mp4", vec![Some(10); 3])
            .with_video("b.mp4", vec![Some(20); 5])
    }

    #[test]
    fn test_no_results_before_first_run() {
        let session = BatchSession::new();
        assert_eq!(session.state(), BatchState::Idle);
        assert!(session.results().is_err());
    }

    #[test]
    fn test_run_to_completion() {
        let (ctx, reporter) = context(source());
        let job = JobConfig {
            videos: vec![video("a.mp4", true), video("b.mp4", true)],
            ..JobConfig::default()
        };

        let mut session = BatchSession::new();
        assert!(session.start(plan_for(&job, &ctx), ctx));
        session.wait();

        assert_eq!(session.state(), BatchState::Idle);
        let results = session.results().unwrap();
        assert_eq!(results.get(Path::new("a.mp4")), Some(&vec![1.0; 3]));
        assert_eq!(results.get(Path::new("b.mp4")), Some(&vec![2.0; 5]));
        assert!(reporter.contains("Batch finished"));
    }

    #[test]
    fn test_rerun_replaces_whole_result_set() {
        let (ctx, _) = context(source());
        let mut session = BatchSession::new();

        let first = JobConfig {
            videos: vec![video("a.mp4", true), video("b.mp4", true)],
            ..JobConfig::default()
        };
        assert!(session.start(plan_for(&first, &ctx), ctx.clone()));
        session.wait();
        assert!(session.results().unwrap().contains(Path::new("b.mp4")));

        let second = JobConfig {
            videos: vec![video("a.mp4", true), video("b.mp4", false)],
            ..JobConfig::default()
        };
        assert!(session.start(plan_for(&second, &ctx), ctx));
        session.wait();

        let results = session.results().unwrap();
        assert!(results.contains(Path::new("a.mp4")));
        assert!(!results.contains(Path::new("b.mp4")));
    }

    /// Engine that blocks on every call until the test releases it.
    struct GatedEngine {
        gate: Mutex<Receiver<()>>,
    }

    impl OcrEngine for GatedEngine {
        fn recognize(&self, _image: &RgbImage, _whitelist: &str) -> Result<Vec<OcrFragment>> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(vec![OcrFragment::new("9", 95.0)])
        }
    }

    #[test]
    fn test_start_while_running_is_dropped() {
        let (release, gate): (Sender<()>, Receiver<()>) = channel();
        let reporter = Arc::new(MemoryReporter::default());
        let ctx = BatchContext {
            source: Arc::new(FakeSource::new(16, 16).with_video("a.mp4", vec![Some(10); 2])),
            engine: Arc::new(GatedEngine {
                gate: Mutex::new(gate),
            }),
            reporter: reporter.clone(),
        };
        let job = JobConfig {
            videos: vec![video("a.mp4", true)],
            ..JobConfig::default()
        };

        let mut session = BatchSession::new();
        assert!(session.start(plan_for(&job, &ctx), ctx.clone()));
        assert_eq!(session.state(), BatchState::Running);

        // Second request while the first is blocked inside OCR
        assert!(!session.start(plan_for(&job, &ctx), ctx));
        assert!(session.results().is_err());

        release.send(()).unwrap();
        release.send(()).unwrap();
        session.wait();

        assert_eq!(session.state(), BatchState::Idle);
        assert_eq!(
            session.results().unwrap().get(Path::new("a.mp4")),
            Some(&vec![9.0, 9.0])
        );
    }

    #[test]
    fn test_run_with_only_empty_series_has_results() {
        let (ctx, _) = context(FakeSource::new(16, 16).with_video("blank.mp4", vec![None; 4]));
        let job = JobConfig {
            videos: vec![video("blank.mp4", true)],
            ..JobConfig::default()
        };

        let mut session = BatchSession::new();
        session.start(plan_for(&job, &ctx), ctx);
        session.wait();

        let results = session.results().unwrap();
        assert_eq!(results.get(Path::new("blank.mp4")), Some(&Vec::new()));
    }

    /// Reporter that panics when the batch announces its start.
    struct PanickingReporter;

    impl StatusReporter for PanickingReporter {
        fn report(&self, text: &str) {
            if text.starts_with("Processing") {
                panic!("reporter failed");
            }
        }
    }

    #[test]
    fn test_failed_rerun_drops_previous_results() {
        let (ctx, _) = context(source());
        let mut session = BatchSession::new();

        let first = JobConfig {
            videos: vec![video("a.mp4", true), video("b.mp4", true)],
            ..JobConfig::default()
        };
        assert!(session.start(plan_for(&first, &ctx), ctx.clone()));
        session.wait();
        assert_eq!(session.results().unwrap().len(), 2);

        let second = JobConfig {
            videos: vec![video("a.mp4", true), video("b.mp4", false)],
            ..JobConfig::default()
        };
        let failing = BatchContext {
            reporter: Arc::new(PanickingReporter),
            ..ctx
        };
        assert!(session.start(plan_for(&second, &failing), failing));
        session.wait();

        assert_eq!(session.state(), BatchState::Idle);
        assert!(session.results().is_err());
    }

    #[test]
    fn test_run_with_no_videos_has_no_results() {
        let (ctx, _) = context(source());
        let mut session = BatchSession::new();

        session.start(plan_for(&JobConfig::default(), &ctx), ctx);
        session.wait();

        assert!(session.results().is_err());
    }
}
