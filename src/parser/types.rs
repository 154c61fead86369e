/// Event names the adapter consumes itself instead of queueing them for a
/// waiting request.
pub const INTERNAL_EVENTS: [&str; 3] = ["DebugStop", "Debug", "Unhandled Exception"];

pub const UNHANDLED_EXCEPTION: &str = "Unhandled Exception";

/// One framed debugger event: a `~>Name:extra` header, any number of
/// `~>data` lines and a bare `~>` terminator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub extra: Option<String>,
    pub data: Vec<String>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: None,
            data: Vec::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        if INTERNAL_EVENTS.contains(&self.name.as_str()) {
            EventKind::Internal
        } else {
            EventKind::External
        }
    }

    /// Text shown to the user for a debuggee fault, with the first sentence
    /// of the description on its own line.
    pub fn fault_message(&self) -> Option<String> {
        if self.name != UNHANDLED_EXCEPTION {
            return None;
        }
        let extra = self.extra.as_deref()?;
        let extra = extra.replacen('.', ".\n", 1).replacen("\n\n", "\n", 1);
        Some(format!("{}: {}", self.name, extra))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Stop notifications, handled as soon as they are framed.
    Internal,
    /// Responses to a command, queued for the caller that issued it.
    External,
}

/// Result of feeding one line of debuggee output through the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framed {
    /// Plain program output with no protocol marker.
    Output(String),
    /// A completed event.
    Event(Event),
}
