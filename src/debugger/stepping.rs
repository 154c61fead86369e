use crate::parser::DebuggeeCommand;

/// Ways of letting a stopped debuggee run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeKind {
    Continue,
    StepOver,
    StepInto,
    StepOut,
}

impl ResumeKind {
    /// Maps a DAP request command onto a resume kind.
    pub fn from_request(command: &str) -> Option<Self> {
        match command {
            "continue" => Some(Self::Continue),
            "next" => Some(Self::StepOver),
            "stepIn" => Some(Self::StepInto),
            "stepOut" => Some(Self::StepOut),
            _ => None,
        }
    }

    pub fn command(self) -> DebuggeeCommand {
        match self {
            Self::Continue => DebuggeeCommand::Continue,
            Self::StepOver => DebuggeeCommand::StepOver,
            Self::StepInto => DebuggeeCommand::StepIn,
            Self::StepOut => DebuggeeCommand::StepOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_names_map_to_commands() {
        let sent: Vec<_> = ["continue", "next", "stepIn", "stepOut"]
            .into_iter()
            .filter_map(ResumeKind::from_request)
            .map(|kind| kind.command().to_string())
            .collect();
        assert_eq!(sent, vec!["r", "s", "e", "l"]);
        assert_eq!(ResumeKind::from_request("pause"), None);
    }
}
