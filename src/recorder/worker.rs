//! Background consumer that turns queued clicks into steps.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::pipeline::{process_click, CaptureContext};
use super::queue::{CaptureQueue, QueueItem};
use super::types::Step;
use crate::error::{Error, Result};

/// How long `stop` waits for queued clicks to finish processing.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Notifications emitted by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    Added(Step),
}

pub struct CaptureWorker {
    queue: CaptureQueue,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
    stop_sent: bool,
}

impl CaptureWorker {
    /// Start consuming `queue` on a dedicated thread.
    pub fn spawn(
        queue: CaptureQueue,
        ctx: CaptureContext,
        events: Sender<StepEvent>,
    ) -> Result<Self> {
        let (done_tx, done_rx) = bounded::<()>(1);
        let worker_queue = queue.clone();
        let handle = thread::Builder::new()
            .name("capture-worker".into())
            .spawn(move || {
                run(&worker_queue, &ctx, &events);
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            queue,
            done: done_rx,
            handle: Some(handle),
            stop_sent: false,
        })
    }

    /// Enqueue the stop sentinel and wait for the loop to finish, then join.
    ///
    /// Clicks queued before the sentinel are still processed. On timeout the
    /// worker keeps running and `stop` may be called again; the sentinel is
    /// only queued once.
    pub fn stop(&mut self, timeout: Duration) -> Result<()> {
        if !self.stop_sent {
            self.queue.push_stop();
            self.stop_sent = true;
        }
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    log::error!("Capture worker panicked");
                }
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                log::error!("Capture worker still busy after {timeout:?}");
                self.handle = Some(handle);
                Err(Error::WorkerStalled)
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        if self.handle.is_some() && !self.stop_sent {
            self.queue.push_stop();
        }
    }
}

fn run(queue: &CaptureQueue, ctx: &CaptureContext, events: &Sender<StepEvent>) {
    log::debug!("Capture worker started");
    loop {
        match queue.pop() {
            QueueItem::Stop => break,
            QueueItem::Click(click) => match process_click(&click, ctx) {
                Ok(step) => {
                    log::info!("Captured step {} -> {}", step.index, step.image_path.display());
                    // Nobody listening is fine.
                    let _ = events.send(StepEvent::Added(step));
                }
                Err(err) => {
                    log::warn!("Skipping click at ({}, {}): {err}", click.x, click.y);
                }
            },
        }
    }
    log::debug!("Capture worker stopped");
}
