mod commands;
mod framer;
mod types;

pub use commands::{DebuggeeCommand, HANDLE_SIGIL};
pub use framer::{EventFramer, MARKER};
pub use types::{Event, EventKind, Framed, INTERNAL_EVENTS, UNHANDLED_EXCEPTION};
