//! Document change notifications.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Rust's ownership model makes traditional observer patterns tricky.
//! Each subscriber gets its own unbounded `tokio::sync::mpsc` channel and
//! the bus keeps the sending halves.
//!
//! Key differences from OOP observers:
//! - No object references to manage
//! - Events are values, not callbacks
//! - Subscribers receive copies (Clone)
//! - A subscriber cannot edit the document from inside a notification;
//!   it sees the event only after `replace` has returned
//!
//! Channels are unbounded so a slow consumer never misses an edit: an
//! undo log or a highlighter that drains its receiver late still sees every
//! `ContentChanged`, in order.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::document::DocumentId;

/// Events emitted by a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Text was replaced. All indices were consistent when this was sent.
    ContentChanged {
        document: DocumentId,
        /// Offset where the replacement happened
        index: usize,
        old_text: String,
        new_text: String,
    },
    /// Every physical line was laid out again (width, tab or font change).
    LayoutChanged(DocumentId),
    /// Caret or anchor moved through `set_selection`.
    SelectionChanged {
        document: DocumentId,
        anchor: usize,
        caret: usize,
    },
    /// The document was written to disk.
    Saved {
        document: DocumentId,
        path: PathBuf,
    },
}

/// Receiving half handed to a subscriber.
pub type EventReceiver = mpsc::UnboundedReceiver<DocumentEvent>;

/// Event bus fanning document events out to every subscriber.
///
/// ## Design
///
/// One channel per subscriber allows:
/// - Multiple subscribers (views, highlighters, the command line)
/// - Async or polling reception
/// - Lossless delivery; dropped receivers are pruned on the next emit
///
/// Clones share the subscriber list, so several documents can feed one bus.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<DocumentEvent>>>>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: DocumentEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Subscribes to events.
    ///
    /// Returns a receiver that will get all future events.
    pub fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sender);
        receiver
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|sender| !sender.is_closed())
            .count()
    }
}

/// Helper for processing events asynchronously.
///
/// ## Example
///
/// ```ignore
/// let mut handler = EventHandler::new(document.subscribe());
///
/// tokio::spawn(async move {
///     while let Some(event) = handler.next().await {
///         if let DocumentEvent::ContentChanged { index, .. } = event {
///             // Invalidate highlighting from `index`
///         }
///     }
/// });
/// ```
pub struct EventHandler {
    receiver: EventReceiver,
}

impl EventHandler {
    /// Creates a new event handler.
    pub fn new(receiver: EventReceiver) -> Self {
        Self { receiver }
    }

    /// Waits for the next event; `None` once every bus clone is gone.
    pub async fn next(&mut self) -> Option<DocumentEvent> {
        self.receiver.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_next(&mut self) -> Option<DocumentEvent> {
        self.receiver.try_recv().ok()
    }
}
