use super::ExecutionEvent;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Stream of events for one subscriber, ending after the terminal event
pub type EventStream = BoxStream<'static, ExecutionEvent>;

/// Receiving half of one subscription
pub type EventReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// Per-run event channel.
///
/// Every event reaches each listener subscribed at the time it is emitted,
/// in emission order. Each subscriber has its own unbounded queue, so a
/// slow reader never loses events and never stalls the run; a run emits at
/// most one event per node plus the terminal one. Late subscribers see
/// nothing that was emitted before they subscribed, unless history is
/// enabled and they read it explicitly.
#[derive(Clone, Default)]
pub struct EventChannel {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ExecutionEvent>>>>,
    history: Option<Arc<Mutex<VecDeque<ExecutionEvent>>>>,
    history_capacity: usize,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the last `history_capacity` events for [`EventChannel::history`]
    pub fn with_history(mut self, history_capacity: usize) -> Self {
        if history_capacity > 0 {
            self.history = Some(Arc::new(Mutex::new(VecDeque::with_capacity(history_capacity))));
            self.history_capacity = history_capacity;
        }
        self
    }

    pub fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(sender);
        }
        receiver
    }

    /// Subscribe and receive events until (and including) the first
    /// terminal event.
    pub fn subscribe_until_terminal(&self) -> EventStream {
        Self::until_terminal(self.subscribe())
    }

    /// Turn a receiver into a stream that ends after the terminal event
    pub fn until_terminal(receiver: EventReceiver) -> EventStream {
        stream::unfold((receiver, false), |(mut receiver, finished)| async move {
            if finished {
                return None;
            }
            let event = receiver.recv().await?;
            let terminal = event.is_terminal();
            Some((event, (receiver, terminal)))
        })
        .boxed()
    }

    /// Stream that yields nothing; used when a run has already finished
    pub fn empty_stream() -> EventStream {
        stream::empty().boxed()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        tracing::debug!(event = event.name(), node = ?event.node_id(), "emit");
        if let Some(history) = &self.history {
            if let Ok(mut history) = history.lock() {
                if history.len() == self.history_capacity {
                    history.pop_front();
                }
                history.push_back(event.clone());
            }
        }
        // Dropped receivers fall out here
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
        }
    }

    /// Recently emitted events, oldest first. Empty unless history is enabled.
    pub fn history(&self) -> Vec<ExecutionEvent> {
        self.history
            .as_ref()
            .and_then(|history| history.lock().ok().map(|h| h.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Subscribers whose receiver is still alive
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subscribers| subscribers.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }
}
