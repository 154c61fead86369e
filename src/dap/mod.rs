mod protocol;
mod server;

use crate::error::{Error, Result};
use std::io::{self, BufRead, BufReader, Write};

pub use protocol::{read_message, DapMessage, DapMessageContent, DapOutput};
pub use server::{DapClient, DapServer, Flow, SharedOutput};

/// Serves DAP on stdin/stdout until the client disconnects.
pub fn run_dap_mode() -> Result<()> {
    let input = BufReader::new(io::stdin());
    let output: Box<dyn Write + Send> = Box::new(io::stdout());
    serve(input, output)
}

pub fn serve<R: BufRead>(input: R, output: Box<dyn Write + Send>) -> Result<()> {
    log::info!("DAP server starting");
    let mut server = DapServer::new(input, output);
    let mut msg_count = 0u64;

    loop {
        let msg = match server.read_message() {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                log::info!("client closed the connection");
                break;
            }
            Err(Error::Json(e)) => {
                log::error!("skipping malformed DAP message: {e}");
                continue;
            }
            Err(e) => return Err(e),
        };
        msg_count += 1;
        log::trace!("message #{msg_count}: {:?}", msg.content);

        match msg.content {
            DapMessageContent::Request { command, arguments } => {
                if server.dispatch(msg.seq, command, arguments)? == Flow::Exit {
                    break;
                }
            }
            _ => log::debug!("ignoring non-request message #{}", msg.seq),
        }
    }

    log::info!("DAP server exiting after {msg_count} messages");
    Ok(())
}
