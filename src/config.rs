use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments of the `launch` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: LaunchArgs,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default = "default_show_empty_scopes")]
    pub show_empty_scopes: bool,
    /// Unset means wait for a response forever.
    #[serde(default)]
    pub command_timeout_ms: Option<u64>,
}

/// Program arguments, either pre-split or as one shell-style string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LaunchArgs {
    List(Vec<String>),
    Line(String),
}

impl Default for LaunchArgs {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl LaunchArgs {
    pub fn to_vec(&self) -> Result<Vec<String>> {
        match self {
            Self::List(args) => Ok(args.clone()),
            Self::Line(line) => shlex::split(line)
                .ok_or_else(|| Error::InvalidConfig(format!("cannot split args `{line}`"))),
        }
    }
}

fn default_show_empty_scopes() -> bool {
    true
}

impl LaunchConfig {
    pub fn from_arguments(arguments: Option<Value>) -> Result<Self> {
        let arguments =
            arguments.ok_or_else(|| Error::InvalidConfig("missing launch arguments".into()))?;
        let config: Self = serde_json::from_value(arguments)?;
        if config.program.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("`program` is empty".into()));
        }
        Ok(config)
    }

    /// `cwd` if given, else the directory holding the program.
    pub fn working_dir(&self) -> Option<PathBuf> {
        self.cwd.clone().or_else(|| {
            self.program
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(PathBuf::from)
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            show_empty_scopes: self.show_empty_scopes,
            command_timeout: self.command_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// The part of the launch configuration the debugger core consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub show_empty_scopes: bool,
    pub command_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            show_empty_scopes: true,
            command_timeout: None,
        }
    }
}
