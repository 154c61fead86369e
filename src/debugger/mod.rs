mod channel;
mod context;
mod pump;
mod references;
mod session;
mod stack;
mod stepping;
mod variables;

pub use channel::{EventChannel, InFlight};
pub use context::DebugContext;
pub use pump::{ClientEvents, EventPump, RunState, THREAD_ID};
pub use references::{ReferenceAllocator, ReferenceId};
pub use session::{CommandSink, DebuggeeInput, DebuggeeProcess};
pub use stack::{
    FrameKind, PresentationHint, Scope, SourceLocation, StackFrame, StackSnapshot, NO_LOCALS,
};
pub use stepping::ResumeKind;
pub use variables::{PendingReferences, Variable, VariableIndex, NO_VARIABLES};
