use super::pump::EventPump;
use crate::config::LaunchConfig;
use crate::error::{Error, Result};
use crate::parser::DebuggeeCommand;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Where commands for the debuggee go.
pub trait CommandSink: Send {
    fn send(&mut self, command: &DebuggeeCommand) -> Result<()>;
}

/// A running debuggee with its output wired into an [`EventPump`].
pub struct DebuggeeProcess {
    child: Child,
    readers: Vec<JoinHandle<()>>,
}

/// Write half of the debuggee's stdin.
pub struct DebuggeeInput {
    stdin: ChildStdin,
}

impl DebuggeeProcess {
    pub fn spawn(config: &LaunchConfig, pump: Arc<EventPump>) -> Result<(Self, DebuggeeInput)> {
        let args = config.args.to_vec()?;
        let mut command = Command::new(&config.program);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = config.working_dir() {
            command.current_dir(dir);
        }

        log::info!("launching {} {:?}", config.program.display(), args);
        let mut child = command.spawn()?;

        let stdin = child.stdin.take().ok_or(Error::NotRunning)?;
        let stdout = child.stdout.take().ok_or(Error::NotRunning)?;
        let stderr = child.stderr.take().ok_or(Error::NotRunning)?;

        let protocol_pump = Arc::clone(&pump);
        let stdout_reader = spawn_reader("debuggee-stdout", stdout, move |line| {
            protocol_pump.feed_line(line)
        })?;
        // The debugger may write its protocol to either stream.
        let stderr_pump = Arc::clone(&pump);
        let stderr_reader = spawn_reader("debuggee-stderr", stderr, move |line| {
            stderr_pump.feed_line(line)
        })?;

        // Once stdout is gone no response can arrive any more.
        let watcher = thread::Builder::new()
            .name("debuggee-exit".to_string())
            .spawn(move || {
                if stdout_reader.join().is_err() {
                    log::error!("debuggee stdout reader panicked");
                }
                pump.finish();
            })?;

        log::info!("debuggee started with pid {}", child.id());
        Ok((
            Self {
                child,
                readers: vec![watcher, stderr_reader],
            },
            DebuggeeInput { stdin },
        ))
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Terminates the debuggee unless it already exited.
    pub fn kill(&mut self) -> Result<()> {
        if let Some(status) = self.child.try_wait()? {
            log::info!("debuggee already exited with {status}");
        } else {
            self.child.kill()?;
            let status = self.child.wait()?;
            log::info!("debuggee killed, {status}");
        }

        for reader in self.readers.drain(..) {
            if reader.join().is_err() {
                log::warn!("debuggee output reader panicked");
            }
        }
        Ok(())
    }
}

impl Drop for DebuggeeProcess {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            log::warn!("failed to stop debuggee: {e}");
        }
    }
}

impl CommandSink for DebuggeeInput {
    fn send(&mut self, command: &DebuggeeCommand) -> Result<()> {
        log::debug!("-> {command}");
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

fn spawn_reader<R, F>(name: &str, stream: R, mut on_line: F) -> Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        on_line(line.trim_end_matches(['\r', '\n']));
                    }
                    Err(e) => {
                        log::warn!("reading debuggee output failed: {e}");
                        break;
                    }
                }
            }
        })?;
    Ok(handle)
}
