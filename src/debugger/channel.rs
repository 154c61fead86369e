use crate::error::{Error, Result};
use crate::parser::{DebuggeeCommand, Event};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Pairs one outbound command with the next externally visible event.
///
/// Only one command may await its response at a time; a second `begin`
/// before the first response is consumed fails with
/// [`Error::CommandInFlight`] instead of mixing up the two responses.
#[derive(Debug, Default)]
pub struct EventChannel {
    state: Mutex<ChannelState>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct ChannelState {
    queue: Vec<Event>,
    signaled: bool,
    in_flight: Option<String>,
    closed: bool,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a response event and wakes the waiting caller.
    pub fn push(&self, event: Event) {
        let mut state = self.lock();
        state.queue.push(event);
        state.signaled = true;
        self.changed.notify_all();
    }

    /// Marks the debuggee output as finished; pending and future waits
    /// return [`Error::ChannelClosed`] once the queue is drained.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    /// Most recently queued event first.
    pub fn pop(&self) -> Option<Event> {
        self.lock().queue.pop()
    }

    /// Claims the channel for `command`. Events left over from an earlier
    /// command, such as a response that arrived after its timeout, are
    /// dropped so only events framed after this point wake the caller.
    pub fn begin(&self, command: &DebuggeeCommand) -> Result<InFlight<'_>> {
        let mut state = self.lock();
        if let Some(pending) = &state.in_flight {
            return Err(Error::CommandInFlight(pending.clone()));
        }
        if state.closed {
            return Err(Error::ChannelClosed);
        }
        if !state.queue.is_empty() {
            log::warn!(
                "dropping {} unclaimed events before `{command}`",
                state.queue.len()
            );
            state.queue.clear();
        }
        state.in_flight = Some(command.to_string());
        state.signaled = false;
        Ok(InFlight {
            channel: self,
            command: command.to_string(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Blocks until no command is awaiting a response.
    pub fn wait_idle(&self) {
        let state = self.lock();
        let _state = self
            .changed
            .wait_while(state, |s| s.in_flight.is_some())
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_flight = None;
        self.changed.notify_all();
    }
}

/// A command awaiting its response. Dropping it frees the channel.
#[derive(Debug)]
pub struct InFlight<'a> {
    channel: &'a EventChannel,
    command: String,
}

impl InFlight<'_> {
    /// Suspends until the response arrives, then takes it off the queue.
    /// `None` waits forever.
    pub fn wait(self, timeout: Option<Duration>) -> Result<Option<Event>> {
        let state = self.channel.lock();
        let ready = |s: &mut ChannelState| !s.signaled && !s.closed;

        let mut state = match timeout {
            None => self
                .channel
                .changed
                .wait_while(state, ready)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                let (state, result) = self
                    .channel
                    .changed
                    .wait_timeout_while(state, timeout, ready)
                    .unwrap_or_else(PoisonError::into_inner);
                if result.timed_out() {
                    return Err(Error::ResponseTimeout {
                        command: self.command.clone(),
                        timeout,
                    });
                }
                state
            }
        };

        if !state.signaled {
            return Err(Error::ChannelClosed);
        }
        state.signaled = false;
        Ok(state.queue.pop())
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.channel.release();
    }
}
