use std::fmt;

/// Prefix marking a variable value as an object handle rather than a literal.
pub const HANDLE_SIGIL: char = '$';

/// Commands understood by the debuggee, one per line on its stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggeeCommand {
    /// `t`: dump every frame with its locals.
    DumpStack,
    /// `d<handle>`: dump the fields of one object.
    DumpReference(String),
    /// `r`
    Continue,
    /// `s`
    StepOver,
    /// `e`
    StepIn,
    /// `l`
    StepOut,
}

impl DebuggeeCommand {
    /// Builds a dump command from a variable value such as `$1a2b`.
    pub fn dump_reference(value: &str) -> Self {
        let handle = value.strip_prefix(HANDLE_SIGIL).unwrap_or(value);
        Self::DumpReference(handle.to_string())
    }

    /// Whether the debuggee answers this command with an event.
    pub fn expects_response(&self) -> bool {
        matches!(self, Self::DumpStack | Self::DumpReference(_))
    }
}

impl fmt::Display for DebuggeeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DumpStack => f.write_str("t"),
            Self::DumpReference(handle) => write!(f, "d{handle}"),
            Self::Continue => f.write_str("r"),
            Self::StepOver => f.write_str("s"),
            Self::StepIn => f.write_str("e"),
            Self::StepOut => f.write_str("l"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_command_alphabet() {
        assert_eq!(DebuggeeCommand::DumpStack.to_string(), "t");
        assert_eq!(DebuggeeCommand::Continue.to_string(), "r");
        assert_eq!(DebuggeeCommand::StepOver.to_string(), "s");
        assert_eq!(DebuggeeCommand::StepIn.to_string(), "e");
        assert_eq!(DebuggeeCommand::StepOut.to_string(), "l");
    }

    #[test]
    fn dump_reference_drops_sigil() {
        let cmd = DebuggeeCommand::dump_reference("$a1b2");
        assert_eq!(cmd, DebuggeeCommand::DumpReference("a1b2".to_string()));
        assert_eq!(cmd.to_string(), "da1b2");
        assert!(cmd.expects_response());
        assert!(!DebuggeeCommand::Continue.expects_response());
    }
}
