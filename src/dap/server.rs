use super::protocol::{read_message, DapMessage, DapOutput};
use crate::config::LaunchConfig;
use crate::debugger::{
    ClientEvents, CommandSink, DebugContext, DebuggeeProcess, EventPump, PresentationHint,
    ReferenceId, ResumeKind, StackFrame, Variable, THREAD_ID,
};
use crate::error::Result;
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type SharedOutput = Arc<Mutex<DapOutput<Box<dyn Write + Send>>>>;

fn lock(output: &SharedOutput) -> MutexGuard<'_, DapOutput<Box<dyn Write + Send>>> {
    output.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends core notifications to the client as DAP events.
pub struct DapClient {
    output: SharedOutput,
}

impl DapClient {
    pub fn new(output: SharedOutput) -> Self {
        Self { output }
    }

    fn event(&self, event: &str, body: Value) {
        if let Err(e) = lock(&self.output).send_event(event, Some(body)) {
            log::error!("failed to send `{event}` event: {e}");
        }
    }
}

impl ClientEvents for DapClient {
    fn stopped(&self, reason: &str) {
        self.event(
            "stopped",
            json!({
                "reason": reason,
                "threadId": THREAD_ID,
                "allThreadsStopped": true
            }),
        );
    }

    fn continued(&self) {
        self.event(
            "continued",
            json!({
                "threadId": THREAD_ID,
                "allThreadsContinued": true
            }),
        );
    }

    fn output(&self, line: &str) {
        self.event(
            "output",
            json!({
                "category": "stderr",
                "output": format!("{line}\n")
            }),
        );
    }

    fn show_error(&self, message: &str) {
        self.event(
            "output",
            json!({
                "category": "important",
                "output": format!("{message}\n")
            }),
        );
    }

    fn terminated(&self) {
        if let Err(e) = lock(&self.output).send_event("terminated", None) {
            log::error!("failed to send `terminated` event: {e}");
        }
    }
}

/// Whether the request loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct DapServer<R> {
    input: R,
    output: SharedOutput,
    context: Option<DebugContext>,
    process: Option<DebuggeeProcess>,
}

impl<R: BufRead> DapServer<R> {
    pub fn new(input: R, writer: Box<dyn Write + Send>) -> Self {
        Self {
            input,
            output: Arc::new(Mutex::new(DapOutput::new(writer))),
            context: None,
            process: None,
        }
    }

    pub fn output(&self) -> &SharedOutput {
        &self.output
    }

    pub fn read_message(&mut self) -> Result<Option<DapMessage>> {
        read_message(&mut self.input)
    }

    pub fn send_response(
        &self,
        seq: u64,
        command: String,
        success: bool,
        body: Option<Value>,
    ) -> Result<()> {
        lock(&self.output).send_response(seq, command, success, None, body)
    }

    pub fn send_error(&self, seq: u64, command: String, message: String) -> Result<()> {
        lock(&self.output).send_response(seq, command, false, Some(message), None)
    }

    pub fn send_event(&self, event: &str, body: Option<Value>) -> Result<()> {
        lock(&self.output).send_event(event, body)
    }

    /// Wires a session to an already running debuggee. `launch` goes through
    /// here after spawning the process.
    pub fn attach(&mut self, pump: &EventPump, sink: Box<dyn CommandSink>, config: &LaunchConfig) {
        self.context = Some(DebugContext::new(pump, sink, config.session_options()));
    }

    pub fn client(&self) -> Arc<dyn ClientEvents> {
        Arc::new(DapClient::new(Arc::clone(&self.output)))
    }

    pub fn dispatch(&mut self, seq: u64, command: String, arguments: Option<Value>) -> Result<Flow> {
        log::debug!("request #{seq}: {command}");
        match command.as_str() {
            "initialize" => self.handle_initialize(seq, command)?,
            "launch" => self.handle_launch(seq, command, arguments)?,
            "configurationDone" => self.send_response(seq, command, true, None)?,
            "threads" => self.handle_threads(seq, command)?,
            "stackTrace" => self.handle_stack_trace(seq, command)?,
            "scopes" => self.handle_scopes(seq, command, arguments)?,
            "variables" => self.handle_variables(seq, command, arguments)?,
            "evaluate" => self.handle_evaluate(seq, command, arguments)?,
            "restart" => self.handle_restart(seq, command)?,
            "disconnect" | "terminate" => {
                self.handle_disconnect(seq, command)?;
                return Ok(Flow::Exit);
            }
            other => match ResumeKind::from_request(other) {
                Some(kind) => self.handle_resume(seq, command, kind)?,
                None => {
                    log::warn!("unhandled DAP command: {command}");
                    self.send_error(seq, command, "unsupported request".to_string())?;
                }
            },
        }
        Ok(Flow::Continue)
    }

    pub fn handle_initialize(&mut self, seq: u64, command: String) -> Result<()> {
        let body = json!({
            "supportsConfigurationDoneRequest": true,
            "supportsEvaluateForHovers": true,
            "supportsRestartRequest": true,
            "supportsTerminateRequest": true,
            "supportsStepBack": false,
            "supportsSetVariable": false,
        });
        self.send_response(seq, command, true, Some(body))?;
        self.send_event("initialized", None)
    }

    pub fn handle_launch(&mut self, seq: u64, command: String, args: Option<Value>) -> Result<()> {
        let config = match LaunchConfig::from_arguments(args) {
            Ok(config) => config,
            Err(e) => {
                log::error!("bad launch configuration: {e}");
                return self.send_error(seq, command, e.to_string());
            }
        };

        let pump = Arc::new(EventPump::new(self.client()));
        match DebuggeeProcess::spawn(&config, Arc::clone(&pump)) {
            Ok((process, input)) => {
                log::info!("launched {} (pid {})", config.program.display(), process.id());
                self.attach(&pump, Box::new(input), &config);
                self.process = Some(process);
                self.send_response(seq, command, true, None)
            }
            Err(e) => {
                log::error!("failed to launch {}: {e}", config.program.display());
                self.send_error(seq, command, format!("failed to launch debuggee: {e}"))
            }
        }
    }

    pub fn handle_threads(&mut self, seq: u64, command: String) -> Result<()> {
        self.send_response(
            seq,
            command,
            true,
            Some(json!({
                "threads": [
                    {
                        "id": THREAD_ID,
                        "name": "Main Thread"
                    }
                ]
            })),
        )
    }

    pub fn handle_stack_trace(&mut self, seq: u64, command: String) -> Result<()> {
        let frames: Vec<Value> = match self.context.as_mut() {
            Some(ctx) => ctx.stack_trace().iter().map(frame_json).collect(),
            None => Vec::new(),
        };

        self.send_response(
            seq,
            command,
            true,
            Some(json!({
                "totalFrames": frames.len(),
                "stackFrames": frames
            })),
        )
    }

    pub fn handle_scopes(&mut self, seq: u64, command: String, args: Option<Value>) -> Result<()> {
        let frame_id = int_argument(&args, "frameId");
        let scopes: Vec<Value> = match self.context.as_mut() {
            Some(ctx) => ctx
                .scopes(frame_id)
                .iter()
                .map(|scope| {
                    json!({
                        "name": scope.name,
                        "variablesReference": scope.reference,
                        "expensive": false
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        self.send_response(seq, command, true, Some(json!({ "scopes": scopes })))
    }

    pub fn handle_variables(
        &mut self,
        seq: u64,
        command: String,
        args: Option<Value>,
    ) -> Result<()> {
        let reference = int_argument(&args, "variablesReference");
        let variables: Vec<Value> = match self.context.as_mut() {
            Some(ctx) => ctx.variables(reference).iter().map(variable_json).collect(),
            None => Vec::new(),
        };

        self.send_response(seq, command, true, Some(json!({ "variables": variables })))
    }

    pub fn handle_evaluate(&mut self, seq: u64, command: String, args: Option<Value>) -> Result<()> {
        let expression = args
            .as_ref()
            .and_then(|v| v.get("expression"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let found = self
            .context
            .as_mut()
            .and_then(|ctx| ctx.evaluate(expression));
        let body = found.map(|variable| {
            json!({
                "result": variable.value,
                "type": variable.type_tag,
                "variablesReference": variable.reference
            })
        });

        self.send_response(seq, command, true, body)
    }

    pub fn handle_resume(&mut self, seq: u64, command: String, kind: ResumeKind) -> Result<()> {
        let body = (kind == ResumeKind::Continue).then(|| json!({ "allThreadsContinued": true }));
        self.send_response(seq, command, true, body)?;
        if let Some(ctx) = self.context.as_mut() {
            ctx.resume(kind);
        }
        Ok(())
    }

    pub fn handle_restart(&mut self, seq: u64, command: String) -> Result<()> {
        if let Some(ctx) = self.context.as_mut() {
            ctx.restart();
        }
        self.send_response(seq, command, true, None)
    }

    pub fn handle_disconnect(&mut self, seq: u64, command: String) -> Result<()> {
        self.context = None;
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill() {
                log::warn!("failed to stop debuggee: {e}");
            }
        }
        self.send_response(seq, command, true, None)
    }
}

fn int_argument(args: &Option<Value>, key: &str) -> ReferenceId {
    args.as_ref()
        .and_then(|v| v.get(key))
        .and_then(Value::as_i64)
        .unwrap_or_default()
}

fn frame_json(frame: &StackFrame) -> Value {
    let mut value = json!({
        "id": frame.id,
        "name": frame.name,
        "line": frame.source.line,
        "column": frame.source.column,
        "source": {
            "name": frame.source.name(),
            "path": frame.source.path,
            "sourceReference": 0
        }
    });
    if frame.presentation_hint() == PresentationHint::Subtle {
        value["presentationHint"] = json!("subtle");
    }
    value
}

fn variable_json(variable: &Variable) -> Value {
    json!({
        "name": variable.name,
        "value": variable.value,
        "type": variable.type_tag,
        "variablesReference": variable.reference
    })
}
