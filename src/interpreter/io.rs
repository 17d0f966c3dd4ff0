//! Front-end capabilities the interpreter talks through
//!
//! The interpreter never touches a terminal directly. Whatever hosts it hands
//! over an [`OutputSink`] for displayed lines and an [`InputSource`] for input
//! requests: the console for `--run`, the editor's channel bridge, or the
//! recording doubles used in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Receives every line the script displays
pub trait OutputSink {
    fn display(&mut self, text: &str);
}

/// Answers input requests. Blocks until the user has replied.
pub trait InputSource {
    /// Returns the raw entered text for `prompt`
    fn request_input(&mut self, prompt: &str) -> String;
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn display(&mut self, text: &str) {
        (**self).display(text);
    }
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn request_input(&mut self, prompt: &str) -> String {
        (**self).request_input(prompt)
    }
}

/// Plain stdout/stdin adapter used by the headless runner
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

impl OutputSink for Console {
    fn display(&mut self, text: &str) {
        println!("{}", text);
    }
}

impl InputSource for Console {
    fn request_input(&mut self, prompt: &str) -> String {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{}: ", prompt);
        let _ = stdout.flush();

        let mut line = String::new();
        if let Err(e) = io::stdin().lock().read_line(&mut line) {
            tracing::warn!("failed to read from stdin: {}", e);
        }
        line.trim_end_matches(['\r', '\n']).to_string()
    }
}

/// Records displayed lines in order
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    pub lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for Transcript {
    fn display(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

/// Replays canned replies and remembers the prompts it was asked.
/// Once the replies run out every request gets an empty string.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    replies: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn request_input(&mut self, prompt: &str) -> String {
        self.prompts.push(prompt.to_string());
        self.replies.pop_front().unwrap_or_default()
    }
}
