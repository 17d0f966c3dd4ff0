use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use unicode_width::UnicodeWidthChar;

use capybara::config::Settings;
use capybara::interpreter::{self, with_script_extension};

use super::run::{self, RunEvent};
use super::{Buffer, Mode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
}

/// Input request from a running script, answered from the status line
pub struct PendingInput {
    pub prompt: String,
    pub text: String,
    reply: oneshot::Sender<String>,
}

pub struct Editor {
    pub buffer: Buffer,
    pub cursor: Cursor,
    pub mode: Mode,
    pub command_buffer: String,
    pub running: bool,
    pub message: Option<String>,
    pub scroll_offset: usize,
    pub settings: Settings,
    /// Lines displayed by scripts, oldest first
    pub output: Vec<String>,
    pub pending_input: Option<PendingInput>,
    /// Events of the script currently running, if any
    pub run: Option<mpsc::UnboundedReceiver<RunEvent>>,
}

impl Editor {
    pub fn new(settings: Settings) -> Self {
        Self::with_buffer(Buffer::new(), settings)
    }

    /// Open `path`, or start a new file there if it does not exist yet
    pub fn open(path: PathBuf, settings: Settings) -> Self {
        match Buffer::open(path.clone()) {
            Ok(buffer) => Self::with_buffer(buffer, settings),
            Err(interpreter::Error::NotFound { .. }) => {
                let mut editor = Self::with_buffer(Buffer::new_file(path), settings);
                editor.set_message("[New File]");
                editor
            }
            Err(e) => {
                let mut editor = Self::with_buffer(Buffer::new(), settings);
                editor.set_message(format!("Error: {}", e));
                editor
            }
        }
    }

    fn with_buffer(buffer: Buffer, settings: Settings) -> Self {
        Self {
            buffer,
            cursor: Cursor::default(),
            mode: Mode::default(),
            command_buffer: String::new(),
            running: true,
            message: None,
            scroll_offset: 0,
            settings,
            output: Vec::new(),
            pending_input: None,
            run: None,
        }
    }

    /// Adjust scroll offset to keep cursor visible within viewport
    pub fn adjust_scroll(&mut self, viewport_height: usize) {
        if self.cursor.line < self.scroll_offset {
            self.scroll_offset = self.cursor.line;
        }
        if viewport_height > 0 && self.cursor.line >= self.scroll_offset + viewport_height {
            self.scroll_offset = self.cursor.line - viewport_height + 1;
        }
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    // Movement

    pub fn move_left(&mut self) {
        self.cursor.col = self.cursor.col.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let line_len = self.buffer.line_len(self.cursor.line);
        self.cursor.col = (self.cursor.col + 1).min(line_len);
    }

    pub fn move_up(&mut self) {
        self.cursor.line = self.cursor.line.saturating_sub(1);
        self.clamp_cursor_col();
    }

    pub fn move_down(&mut self) {
        let last = self.buffer.line_count().saturating_sub(1);
        self.cursor.line = (self.cursor.line + 1).min(last);
        self.clamp_cursor_col();
    }

    fn clamp_cursor_col(&mut self) {
        let line_len = self.buffer.line_len(self.cursor.line);
        if self.cursor.col > line_len {
            self.cursor.col = line_len;
        }
    }

    /// Terminal cells between the start of the line and the cursor
    pub fn cursor_display_col(&self) -> usize {
        self.buffer
            .line(self.cursor.line)
            .chars()
            .take(self.cursor.col)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    pub fn move_to_line_start(&mut self) {
        self.cursor.col = 0;
    }

    pub fn move_to_line_end(&mut self) {
        self.cursor.col = self.buffer.line_len(self.cursor.line);
    }

    pub fn move_to_first_line(&mut self) {
        self.cursor.line = 0;
        self.clamp_cursor_col();
    }

    pub fn move_to_last_line(&mut self) {
        self.cursor.line = self.buffer.line_count().saturating_sub(1);
        self.clamp_cursor_col();
    }

    // Modes

    pub fn enter_insert_mode(&mut self) {
        self.mode = Mode::Insert;
    }

    /// Append after cursor (a)
    pub fn append(&mut self) {
        self.move_right();
        self.enter_insert_mode();
    }

    /// Append at end of line (A)
    pub fn append_end_of_line(&mut self) {
        self.move_to_line_end();
        self.enter_insert_mode();
    }

    /// Open line below (o)
    pub fn open_line_below(&mut self) {
        self.move_to_line_end();
        self.insert_newline();
        self.enter_insert_mode();
    }

    pub fn enter_normal_mode(&mut self) {
        self.mode = Mode::Normal;
        self.command_buffer.clear();
        self.clamp_cursor_col();
    }

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_buffer.clear();
    }

    // Text editing

    pub fn insert_char(&mut self, ch: char) {
        self.buffer
            .insert_char(self.cursor.line, self.cursor.col, ch);
        self.cursor.col += 1;
    }

    pub fn insert_tab(&mut self) {
        let unit = self.settings.indent_unit();
        self.buffer
            .insert_str(self.cursor.line, self.cursor.col, &unit);
        self.cursor.col += unit.chars().count();
    }

    pub fn insert_newline(&mut self) {
        self.buffer.insert_char(self.cursor.line, self.cursor.col, '\n');
        self.cursor.line += 1;
        self.cursor.col = 0;
    }

    pub fn delete_char_backward(&mut self) {
        if self.cursor.col > 0 {
            self.buffer.backspace(self.cursor.line, self.cursor.col);
            self.cursor.col -= 1;
        } else if self.cursor.line > 0 {
            let prev_line_len = self.buffer.line_len(self.cursor.line - 1);
            self.buffer.backspace(self.cursor.line, 0);
            self.cursor.line -= 1;
            self.cursor.col = prev_line_len;
        }
    }

    // Commands

    pub fn execute_command(&mut self) {
        let cmd = self.command_buffer.trim().to_string();
        let (name, arg) = match cmd.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (cmd.as_str(), None),
        };

        match name {
            "q" | "quit" => self.quit(),
            "w" | "write" => {
                self.save(arg.map(PathBuf::from));
            }
            "wq" => {
                if self.save(arg.map(PathBuf::from)) {
                    self.quit();
                }
            }
            "e" | "edit" => match arg {
                Some(path) => self.open_file(PathBuf::from(path)),
                None => self.set_message("Usage: :e PATH"),
            },
            "r" | "run" => self.start_run(),
            "clear" => self.output.clear(),
            "" => {}
            _ => {
                self.set_message(format!("Unknown command: {}", cmd));
            }
        }
        self.command_buffer.clear();
        if self.mode == Mode::Command {
            self.mode = Mode::Normal;
        }
    }

    /// Save to `path` (save-as) or to the current file. Returns true on success.
    pub fn save(&mut self, path: Option<PathBuf>) -> bool {
        let target = match path.map(with_script_extension) {
            Some(path) => path,
            None => match self.buffer.path() {
                Some(path) => path.to_path_buf(),
                None => {
                    self.set_message("No file name (use :w PATH)");
                    return false;
                }
            },
        };

        match self.buffer.save_as(target.clone()) {
            Ok(()) => {
                info!(path = %target.display(), "buffer written");
                self.set_message(format!("\"{}\" written", target.display()));
                true
            }
            Err(e) => {
                self.set_message(format!("Error: {}", e));
                false
            }
        }
    }

    pub fn open_file(&mut self, path: PathBuf) {
        match Buffer::open(path) {
            Ok(buffer) => {
                self.buffer = buffer;
                self.cursor = Cursor::default();
                self.scroll_offset = 0;
                self.mode = Mode::Normal;
            }
            Err(e) => self.set_message(format!("Error: {}", e)),
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    // Script runs

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Run the buffer text through a fresh interpreter
    pub fn start_run(&mut self) {
        if self.is_running() {
            self.set_message("A script is already running");
            return;
        }
        if self.settings.clear_output_on_run {
            self.output.clear();
        }

        let code = self.buffer.text().trim().to_string();
        info!("starting run");
        self.run = Some(run::spawn(code, self.settings.storage_dir.clone()));
        self.set_message("Running...");
    }

    pub fn handle_run_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::Output(text) => self.output.push(text),
            RunEvent::Input { prompt, reply } => {
                self.pending_input = Some(PendingInput {
                    prompt,
                    text: String::new(),
                    reply,
                });
                self.mode = Mode::Prompt;
            }
            RunEvent::Finished(Ok(())) => {
                self.run = None;
                self.set_message("Run finished");
            }
            RunEvent::Finished(Err(e)) => {
                warn!("run failed: {}", e);
                self.run = None;
                self.output.push(format!("error: {}", e));
                self.set_message(format!("Error: {}", e));
            }
        }
    }

    pub fn prompt_push(&mut self, ch: char) {
        if let Some(pending) = self.pending_input.as_mut() {
            pending.text.push(ch);
        }
    }

    pub fn prompt_pop(&mut self) {
        if let Some(pending) = self.pending_input.as_mut() {
            pending.text.pop();
        }
    }

    /// Send the typed reply back to the waiting script
    pub fn submit_prompt(&mut self) {
        if let Some(pending) = self.pending_input.take() {
            if pending.reply.send(pending.text).is_err() {
                warn!("script stopped before its input arrived");
            }
        }
        self.mode = Mode::Normal;
    }
}
