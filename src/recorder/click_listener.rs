//! Global left-click listener.
//!
//! A [`ClickHook`] is the platform piece: it watches the pointer and calls
//! [`ClickSink::deliver`] for every left-button press. The sink only enqueues,
//! so the hook's context never waits on capture work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use device_query::{DeviceQuery, DeviceState};

use super::click_event::ClickEvent;
use super::queue::QueueSender;
use super::session::Session;
use crate::error::{Error, Result};

/// Pointer sampling period of [`PollingHook`].
const POLL_INTERVAL: Duration = Duration::from_millis(8);
/// Left button slot in `device_query`'s button array (slot 0 is unused).
const LEFT_BUTTON: usize = 1;

/// Where hooks deliver clicks.
#[derive(Clone)]
pub struct ClickSink {
    sender: QueueSender,
    session: Arc<Session>,
}

impl ClickSink {
    pub fn new(sender: QueueSender, session: Arc<Session>) -> Self {
        Self { sender, session }
    }

    /// Enqueue a click if the session is recording. Never blocks.
    pub fn deliver(&self, x: i32, y: i32) {
        if self.session.is_recording() {
            self.sender.push(ClickEvent::new(x, y));
        }
    }
}

/// Platform click source.
pub trait ClickHook: Send {
    /// Start delivering left clicks to `sink`. An `Err` describes why the
    /// hook is unavailable.
    fn install(&mut self, sink: ClickSink) -> std::result::Result<(), String>;
    fn uninstall(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Active,
}

pub struct ClickListener {
    hook: Box<dyn ClickHook>,
    state: ListenerState,
}

impl ClickListener {
    pub fn new(hook: Box<dyn ClickHook>) -> Self {
        Self {
            hook,
            state: ListenerState::Idle,
        }
    }

    /// Install the hook. Stays idle and returns `CaptureUnavailable` if the
    /// platform refuses.
    pub fn begin(&mut self, sink: ClickSink) -> Result<()> {
        if self.state == ListenerState::Active {
            return Ok(());
        }
        self.hook.install(sink).map_err(Error::CaptureUnavailable)?;
        self.state = ListenerState::Active;
        log::debug!("Click hook installed");
        Ok(())
    }

    /// Uninstall the hook. No-op when idle.
    pub fn end(&mut self) {
        if self.state == ListenerState::Idle {
            return;
        }
        self.hook.uninstall();
        self.state = ListenerState::Idle;
        log::debug!("Click hook removed");
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }
}

impl Drop for ClickListener {
    fn drop(&mut self) {
        self.end();
    }
}

/// Cross-platform hook that samples the pointer with `device_query` and
/// reports left-button press edges.
#[derive(Default)]
pub struct PollingHook {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PollingHook {
    pub fn new() -> Self {
        Self::default()
    }

    fn run_poll_loop(
        running: Arc<AtomicBool>,
        sink: ClickSink,
        setup_tx: mpsc::Sender<std::result::Result<(), String>>,
    ) {
        // DeviceState panics when there is no display or input permission.
        let device = match std::panic::catch_unwind(DeviceState::new) {
            Ok(device) => device,
            Err(_) => {
                let _ = setup_tx.send(Err(
                    "Cannot read pointer state. Check display access and input permissions."
                        .to_string(),
                ));
                return;
            }
        };
        let _ = setup_tx.send(Ok(()));

        let mut was_pressed = left_pressed(&device.get_mouse().button_pressed);
        while running.load(Ordering::SeqCst) {
            let mouse = device.get_mouse();
            let pressed = left_pressed(&mouse.button_pressed);
            if pressed && !was_pressed {
                sink.deliver(mouse.coords.0, mouse.coords.1);
            }
            was_pressed = pressed;
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn left_pressed(buttons: &[bool]) -> bool {
    buttons.get(LEFT_BUTTON).copied().unwrap_or(false)
}

impl ClickHook for PollingHook {
    fn install(&mut self, sink: ClickSink) -> std::result::Result<(), String> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let (setup_tx, setup_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("click-hook".into())
            .spawn(move || Self::run_poll_loop(running_clone, sink, setup_tx))
            .map_err(|e| format!("Failed to start click hook thread: {e}"))?;

        // Wait for the device to be opened (with timeout)
        match setup_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {
                self.running = running;
                self.handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                Err("Timeout waiting for click hook setup".to_string())
            }
        }
    }

    fn uninstall(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
