//! Running the buffer without freezing the UI
//!
//! The interpreter is synchronous, so a run happens on a blocking worker.
//! Displayed lines and input requests are forwarded to the UI loop as
//! [`RunEvent`]s; an input request carries a oneshot sender the UI answers
//! once the user presses Enter.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use capybara::interpreter::{InputSource, Interpreter, OutputSink};

#[derive(Debug)]
pub enum RunEvent {
    Output(String),
    Input {
        prompt: String,
        reply: oneshot::Sender<String>,
    },
    /// The run ended; `Err` holds the message of the error that stopped it
    Finished(Result<(), String>),
}

/// Adapter that hands interpreter I/O over to the UI loop
#[derive(Clone)]
struct ChannelIo {
    events: mpsc::UnboundedSender<RunEvent>,
}

impl OutputSink for ChannelIo {
    fn display(&mut self, text: &str) {
        if self.events.send(RunEvent::Output(text.to_string())).is_err() {
            debug!("editor gone, dropping output");
        }
    }
}

impl InputSource for ChannelIo {
    fn request_input(&mut self, prompt: &str) -> String {
        let (reply, answer) = oneshot::channel();
        let request = RunEvent::Input {
            prompt: prompt.to_string(),
            reply,
        };
        if self.events.send(request).is_err() {
            warn!("editor gone, answering input request with empty text");
            return String::new();
        }
        answer.blocking_recv().unwrap_or_default()
    }
}

/// Run `code` on a blocking worker. `storage_dir` overrides the default
/// folder for `저장바라~` saves.
pub fn spawn(code: String, storage_dir: Option<PathBuf>) -> mpsc::UnboundedReceiver<RunEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || {
        let io = ChannelIo { events: tx.clone() };
        let interpreter = match storage_dir {
            Some(dir) => Interpreter::with_storage_dir(io.clone(), io, dir),
            None => Interpreter::new(io.clone(), io),
        };
        let result = interpreter.and_then(|mut interpreter| interpreter.execute(&code));
        let _ = tx.send(RunEvent::Finished(result.map_err(|e| e.to_string())));
    });

    rx
}
