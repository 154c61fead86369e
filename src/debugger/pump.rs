use super::channel::EventChannel;
use crate::parser::{Event, EventFramer, EventKind, Framed};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// The debuggee is single threaded as far as the client is concerned.
pub const THREAD_ID: i64 = 1;

/// Notifications sent to the debugging client.
pub trait ClientEvents: Send + Sync {
    fn stopped(&self, reason: &str);
    fn continued(&self);
    /// Debuggee output that is not part of the protocol.
    fn output(&self, line: &str);
    /// A fault the user should not miss.
    fn show_error(&self, message: &str);
    fn terminated(&self) {}
}

/// Run/stop status shared by the output pump and the request path.
#[derive(Debug, Default)]
pub struct RunState {
    stopped: AtomicBool,
    stops: AtomicU64,
}

impl RunState {
    pub fn mark_stopped(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    pub fn mark_running(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of stops seen so far; a change tells the request path that
    /// its per-stop caches are stale.
    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Feeds debuggee output through the framer and routes what comes out:
/// plain lines to the client, stop events to the run state, responses to
/// the correlation channel.
pub struct EventPump {
    framer: Mutex<EventFramer>,
    channel: Arc<EventChannel>,
    state: Arc<RunState>,
    client: Arc<dyn ClientEvents>,
}

impl EventPump {
    pub fn new(client: Arc<dyn ClientEvents>) -> Self {
        Self {
            framer: Mutex::new(EventFramer::new()),
            channel: Arc::new(EventChannel::new()),
            state: Arc::new(RunState::default()),
            client,
        }
    }

    pub fn channel(&self) -> &Arc<EventChannel> {
        &self.channel
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    pub fn client(&self) -> &Arc<dyn ClientEvents> {
        &self.client
    }

    /// `chunk` must end on a line boundary.
    pub fn feed(&self, chunk: &str) {
        let framed = self
            .framer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .feed(chunk);
        framed.into_iter().for_each(|item| self.dispatch(item));
    }

    pub fn feed_line(&self, line: &str) {
        let framed = self
            .framer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .feed_line(line);
        if let Some(item) = framed {
            self.dispatch(item);
        }
    }

    /// The debuggee's output stream ended.
    pub fn finish(&self) {
        log::info!("debuggee output closed");
        if self
            .framer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_open()
        {
            log::warn!("debuggee output ended inside an event");
        }
        self.channel.close();
        self.client.terminated();
    }

    fn dispatch(&self, item: Framed) {
        match item {
            Framed::Output(line) => self.client.output(&line),
            Framed::Event(event) => match event.kind() {
                EventKind::Internal => self.handle_stop(&event),
                EventKind::External => {
                    log::debug!(
                        "queued event `{}` with {} data lines",
                        event.name,
                        event.data.len()
                    );
                    self.channel.push(event);
                }
            },
        }
    }

    fn handle_stop(&self, event: &Event) {
        log::info!("debuggee stopped: {}", event.name);
        self.state.mark_stopped();
        self.client.stopped(&event.name);
        if let Some(message) = event.fault_message() {
            self.client.show_error(&message);
        }
    }
}
