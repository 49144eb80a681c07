pub mod capture;
pub mod click_event;
pub mod click_listener;
pub mod highlight;
pub mod pipeline;
pub mod queue;
pub mod session;
pub mod state;
pub mod store;
pub mod types;
pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::archive;
use crate::error::Result;
use crate::export;
use crate::export::layout::PageGeometry;
use crate::settings::Settings;
use capture::{FrameSource, XcapSource};
use click_listener::{ClickHook, ClickListener, ClickSink, PollingHook};
use pipeline::CaptureContext;
use queue::CaptureQueue;
use session::Session;
use state::{RecorderState, SessionState};
use store::StepStore;
use types::Step;
use worker::{CaptureWorker, StepEvent, STOP_TIMEOUT};

/// Owns one recording session at a time and everything that feeds it.
pub struct Recorder {
    settings: Settings,
    root: PathBuf,
    state: RecorderState,
    store: StepStore,
    queue: CaptureQueue,
    frames: Arc<dyn FrameSource>,
    listener: ClickListener,
    worker: Option<CaptureWorker>,
    session: Option<Arc<Session>>,
    events: (Sender<StepEvent>, Receiver<StepEvent>),
    started_at: Option<Instant>,
    stop_timeout: Duration,
}

impl Recorder {
    /// Recorder using the polling click hook and `xcap` monitor capture.
    pub fn new(settings: Settings) -> Self {
        Self::with_backends(
            settings,
            Box::new(PollingHook::new()),
            Arc::new(XcapSource),
            Session::default_root(),
        )
    }

    /// Recorder with explicit platform pieces. Session directories are
    /// created under `root`.
    pub fn with_backends(
        settings: Settings,
        hook: Box<dyn ClickHook>,
        frames: Arc<dyn FrameSource>,
        root: PathBuf,
    ) -> Self {
        Self {
            settings: settings.sanitized(),
            root,
            state: RecorderState::new(),
            store: StepStore::new(),
            queue: CaptureQueue::new(),
            frames,
            listener: ClickListener::new(hook),
            worker: None,
            session: None,
            events: unbounded(),
            started_at: None,
            stop_timeout: STOP_TIMEOUT,
        }
    }

    /// How long `stop` waits for the capture worker before giving up.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state.current_state()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Shared handle for editing titles and annotations.
    pub fn store(&self) -> &StepStore {
        &self.store
    }

    pub fn steps(&self) -> Vec<Step> {
        self.store.snapshot()
    }

    /// Directory holding the current session's screenshots.
    pub fn session_dir(&self) -> Option<&Path> {
        self.session.as_deref().map(|s| s.temp_dir.as_path())
    }

    /// Step-added notifications. All receivers share one stream.
    pub fn subscribe(&self) -> Receiver<StepEvent> {
        self.events.1.clone()
    }

    /// Begin a fresh recording. The previous session's steps and
    /// screenshots are discarded.
    pub fn start(&mut self) -> Result<()> {
        self.state.start()?;
        if let Err(err) = self.begin_session() {
            self.state.reset();
            return Err(err);
        }
        self.started_at = Some(Instant::now());
        log::info!("Recording started");
        Ok(())
    }

    fn begin_session(&mut self) -> Result<()> {
        if let Some(old) = self.session.take() {
            old.cleanup();
        }
        // Fresh queue and store per session: a worker abandoned by an earlier
        // discard can neither take these clicks nor append to these steps.
        let dropped = self.queue.drain();
        if dropped > 0 {
            log::debug!("Dropped {dropped} stale click events");
        }
        self.queue = CaptureQueue::new();
        self.store = StepStore::new();

        let session = Arc::new(Session::new(&self.root)?);
        session.set_recording(true);

        let ctx = CaptureContext {
            session: Arc::clone(&session),
            frames: Arc::clone(&self.frames),
            store: self.store.clone(),
            highlight: self.settings.highlight(),
            fallback: self.settings.fallback_surface,
        };
        let mut worker = CaptureWorker::spawn(self.queue.clone(), ctx, self.events.0.clone())?;

        let sink = ClickSink::new(self.queue.sender(), Arc::clone(&session));
        if let Err(err) = self.listener.begin(sink) {
            session.set_recording(false);
            if let Err(stop_err) = worker.stop(self.stop_timeout) {
                log::error!("Capture worker did not shut down: {stop_err}");
            }
            session.cleanup();
            return Err(err);
        }

        self.worker = Some(worker);
        self.session = Some(session);
        Ok(())
    }

    /// Stop recording. Every click already queued is captured before this
    /// returns.
    ///
    /// If the worker is still busy after the stop timeout, `WorkerStalled` is
    /// returned and the recorder stays in `Recording`, so the steps cannot be
    /// saved or exported yet. Call `stop` again to keep waiting, or `discard`.
    pub fn stop(&mut self) -> Result<Vec<Step>> {
        self.state.ensure_recording()?;
        self.listener.end();
        if let Some(session) = &self.session {
            session.set_recording(false);
        }
        if let Some(worker) = self.worker.as_mut() {
            worker.stop(self.stop_timeout)?;
        }
        self.worker = None;
        self.state.stop()?;

        let steps = self.store.snapshot();
        let elapsed = self
            .started_at
            .take()
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or_default();
        log::info!("Recording stopped: {} steps in {elapsed:.1}s", steps.len());
        Ok(steps)
    }

    /// Throw away the current recording and its screenshots.
    pub fn discard(&mut self) {
        self.listener.end();
        if let Some(session) = self.session.take() {
            session.set_recording(false);
            if let Some(mut worker) = self.worker.take() {
                if let Err(err) = worker.stop(self.stop_timeout) {
                    log::error!("Abandoning capture worker: {err}");
                }
            }
            session.cleanup();
        }
        self.queue.drain();
        self.queue = CaptureQueue::new();
        self.store = StepStore::new();
        self.started_at = None;
        self.state.reset();
        log::info!("Recording discarded");
    }

    pub fn save_project(&self, path: &Path) -> Result<()> {
        self.state.ensure_editable()?;
        archive::save_project(&self.store.snapshot(), path)
    }

    /// Replace the current steps with the contents of a project bundle.
    /// On failure nothing changes.
    pub fn load_project(&mut self, path: &Path) -> Result<usize> {
        self.state.ensure_editable()?;
        let session = Session::new(&self.root)?;
        let steps = match archive::load_project(path, &session.temp_dir) {
            Ok(steps) => steps,
            Err(err) => {
                session.cleanup();
                return Err(err);
            }
        };
        if let Err(err) = self.store.replace(steps) {
            session.cleanup();
            return Err(err);
        }

        if let Some(old) = self.session.replace(Arc::new(session)) {
            old.cleanup();
        }
        Ok(self.store.len())
    }

    /// Lay out and write the current steps. Returns the page count.
    pub fn export_pdf(&self, path: &Path, title: &str) -> Result<usize> {
        self.state.ensure_editable()?;
        let geometry = PageGeometry::a4(self.settings.page_margin);
        export::export_pdf(&self.store.snapshot(), &geometry, title, path)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.listener.end();
        if let Some(session) = &self.session {
            session.set_recording(false);
        }
        if let Some(mut worker) = self.worker.take() {
            let _ = worker.stop(self.stop_timeout);
        }
    }
}
