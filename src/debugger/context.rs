use super::channel::EventChannel;
use super::pump::{ClientEvents, EventPump, RunState};
use super::references::{ReferenceAllocator, ReferenceId};
use super::session::CommandSink;
use super::stack::{Scope, StackFrame, StackSnapshot};
use super::stepping::ResumeKind;
use super::variables::{PendingReferences, Variable, VariableIndex};
use crate::config::SessionOptions;
use crate::error::Result;
use crate::parser::{DebuggeeCommand, Event};
use std::sync::Arc;

/// State of one debug session and the request handlers working on it.
///
/// Frames, scopes, dumps and pending references belong to the current stop
/// and are replaced by every [`stack_trace`](Self::stack_trace). The variable
/// index lives until the debuggee is resumed or restarted.
///
/// Handlers never fail: a missing or late response yields an empty result.
pub struct DebugContext {
    sink: Box<dyn CommandSink>,
    client: Arc<dyn ClientEvents>,
    channel: Arc<EventChannel>,
    state: Arc<RunState>,
    options: SessionOptions,
    refs: ReferenceAllocator,
    stack: StackSnapshot,
    pending: PendingReferences,
    index: VariableIndex,
    seen_stops: u64,
}

impl DebugContext {
    pub fn new(pump: &EventPump, sink: Box<dyn CommandSink>, options: SessionOptions) -> Self {
        Self {
            sink,
            client: Arc::clone(pump.client()),
            channel: Arc::clone(pump.channel()),
            state: Arc::clone(pump.state()),
            options,
            refs: ReferenceAllocator::new(),
            stack: StackSnapshot::default(),
            pending: PendingReferences::default(),
            index: VariableIndex::default(),
            seen_stops: 0,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    pub fn stack(&self) -> &StackSnapshot {
        &self.stack
    }

    pub fn pending(&self) -> &PendingReferences {
        &self.pending
    }

    pub fn variable_index(&self) -> &VariableIndex {
        &self.index
    }

    /// Sends `command` and waits for the event answering it.
    fn request(&mut self, command: DebuggeeCommand) -> Result<Option<Event>> {
        let channel = Arc::clone(&self.channel);
        let flight = channel.begin(&command)?;
        self.sink.send(&command)?;
        flight.wait(self.options.command_timeout)
    }

    fn discard_stop_state(&mut self) {
        self.stack = StackSnapshot::default();
        self.pending.clear();
    }

    /// Drops per-stop caches if the debuggee stopped again since we last
    /// looked.
    fn sync_stop(&mut self) {
        let stops = self.state.stop_count();
        if stops != self.seen_stops {
            self.seen_stops = stops;
            self.discard_stop_state();
        }
    }

    /// Dumps the debuggee's stack and rebuilds frames and scopes from it.
    pub fn stack_trace(&mut self) -> &[StackFrame] {
        self.sync_stop();
        self.refs.reset();
        self.discard_stop_state();

        match self.request(DebuggeeCommand::DumpStack) {
            Ok(Some(event)) => {
                self.stack = StackSnapshot::build(&event.data, &mut self.refs);
                log::debug!(
                    "stack dump: {} frames, {} scopes, references up to {}",
                    self.stack.frames.len(),
                    self.stack.scopes.len(),
                    self.refs.last()
                );
            }
            Ok(None) => log::warn!("stack dump request got no event"),
            Err(e) => log::warn!("stack dump failed: {e}"),
        }

        &self.stack.frames
    }

    pub fn scopes(&mut self, frame_id: ReferenceId) -> Vec<Scope> {
        self.sync_stop();
        self.stack
            .scopes_for(frame_id, self.options.show_empty_scopes)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Children of a scope or of an object handle.
    pub fn variables(&mut self, reference: ReferenceId) -> Vec<Variable> {
        self.sync_stop();

        // Converted afresh on every request: handles get new ids, so a
        // re-opened scope can be expanded again.
        if self.stack.has_dump(reference) {
            let lines = self.stack.dumps.get(&reference).cloned().unwrap_or_default();
            return self.convert_all(&lines);
        }

        if self.stack.is_root_scope(reference) {
            return vec![Variable::no_variables()];
        }

        self.expand(reference)
    }

    /// Dumps a pending handle variable. Each handle is dumped once; asking
    /// again for the same reference in the same stop returns nothing.
    // TODO: keep expanded children per reference so a collapsed and
    // re-opened object in the variables view still shows its fields.
    fn expand(&mut self, reference: ReferenceId) -> Vec<Variable> {
        let Some(value) = self.pending.get(reference).map(|v| v.value.clone()) else {
            log::debug!("no pending variable for reference {reference}");
            return Vec::new();
        };

        match self.request(DebuggeeCommand::dump_reference(&value)) {
            Ok(Some(event)) => {
                let variables = self.convert_all(&event.data);
                self.pending.take(reference);
                variables
            }
            Ok(None) => {
                log::warn!("dump of {value} got no event");
                Vec::new()
            }
            Err(e) => {
                log::warn!("dump of {value} failed: {e}");
                Vec::new()
            }
        }
    }

    fn convert_all(&mut self, lines: &[String]) -> Vec<Variable> {
        lines
            .iter()
            .map(|line| {
                let variable = Variable::convert(line, &mut self.refs, &mut self.pending);
                self.index.record(&variable);
                variable
            })
            .collect()
    }

    /// Looks an expression up among the variables shown so far.
    pub fn evaluate(&mut self, expression: &str) -> Option<Variable> {
        self.channel.wait_idle();
        self.index.lookup(expression).cloned()
    }

    /// Lets the debuggee run. The next stop arrives as an event on the
    /// output pump; nothing is awaited here.
    pub fn resume(&mut self, kind: ResumeKind) {
        self.index.clear();
        self.pending.clear();
        self.state.mark_running();
        self.client.continued();

        let command = kind.command();
        if let Err(e) = self.sink.send(&command) {
            log::warn!("sending {kind:?} failed: {e}");
        }
    }

    pub fn restart(&mut self) {
        self.index.clear();
        self.pending.clear();
    }
}
