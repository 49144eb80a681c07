//! FIFO between the click hook and the capture worker.
//!
//! Producers only ever enqueue; the unbounded channel means `push` never
//! blocks the hook callback. The single consumer blocks in `pop`.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::click_event::ClickEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItem {
    Click(ClickEvent),
    /// Sentinel: the worker exits after seeing this.
    Stop,
}

#[derive(Clone)]
pub struct CaptureQueue {
    tx: Sender<QueueItem>,
    rx: Receiver<QueueItem>,
}

/// Push-only handle given to input sources.
#[derive(Clone)]
pub struct QueueSender {
    tx: Sender<QueueItem>,
}

impl QueueSender {
    pub fn push(&self, event: ClickEvent) {
        // The queue owns a receiver for its whole lifetime, so this cannot fail.
        let _ = self.tx.send(QueueItem::Click(event));
    }
}

impl CaptureQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> QueueSender {
        QueueSender {
            tx: self.tx.clone(),
        }
    }

    pub fn push(&self, event: ClickEvent) {
        let _ = self.tx.send(QueueItem::Click(event));
    }

    pub fn push_stop(&self) {
        let _ = self.tx.send(QueueItem::Stop);
    }

    /// Block until an item is available.
    pub fn pop(&self) -> QueueItem {
        self.rx.recv().unwrap_or(QueueItem::Stop)
    }

    /// Discard everything queued so far, returning how many items were dropped.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for CaptureQueue {
    fn default() -> Self {
        Self::new()
    }
}
