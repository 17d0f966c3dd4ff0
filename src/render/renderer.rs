use std::io::{self, Write, stdout};

use crossterm::{
    cursor::{Hide, MoveTo, SetCursorStyle, Show},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::editor::{Editor, Mode};

const GUTTER_WIDTH: u16 = 4;

const LINE_NUMBER: Color = Color::DarkGrey;
const LINE_NUMBER_ACTIVE: Color = Color::Yellow;
const SEPARATOR: Color = Color::DarkGrey;
const OUTPUT_ERROR: Color = Color::Red;
const STATUS_BG: Color = Color::DarkBlue;
const STATUS_FG: Color = Color::White;
const MESSAGE: Color = Color::Yellow;
const PROMPT: Color = Color::Green;

pub struct Renderer {
    pub width: u16,
    pub height: u16,
}

impl Renderer {
    pub fn new() -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self { width, height })
    }

    pub fn setup() -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            EnterAlternateScreen,
            DisableLineWrap,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(())
    }

    pub fn teardown() -> io::Result<()> {
        execute!(
            stdout(),
            ResetColor,
            SetCursorStyle::DefaultUserShape,
            Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    fn output_height(&self, editor: &Editor) -> u16 {
        // Leave at least one text row, the separator and the status line
        editor
            .settings
            .output_height
            .min(self.height.saturating_sub(3))
    }

    /// Rows available for buffer text
    pub fn text_height(&self, editor: &Editor) -> usize {
        self.height
            .saturating_sub(2 + self.output_height(editor)) as usize
    }

    pub fn render(&self, editor: &Editor) -> io::Result<()> {
        let mut stdout = stdout();

        // Hide cursor during redraw to prevent flicker
        queue!(stdout, Hide)?;

        let text_height = self.text_height(editor) as u16;
        self.render_text(&mut stdout, editor, text_height)?;
        self.render_output(&mut stdout, editor, text_height)?;
        self.render_status_line(&mut stdout, editor)?;
        self.position_cursor(&mut stdout, editor)?;

        stdout.flush()?;
        Ok(())
    }

    fn gutter(&self, editor: &Editor) -> u16 {
        if editor.settings.show_line_numbers {
            GUTTER_WIDTH
        } else {
            0
        }
    }

    fn render_text(&self, stdout: &mut impl Write, editor: &Editor, rows: u16) -> io::Result<()> {
        let line_count = editor.buffer.line_count();
        let gutter = self.gutter(editor);
        let text_width = self.width.saturating_sub(gutter) as usize;

        for row in 0..rows {
            let line_idx = row as usize + editor.scroll_offset;
            queue!(stdout, MoveTo(0, row), Clear(ClearType::CurrentLine))?;

            if line_idx < line_count {
                if gutter > 0 {
                    let color = if line_idx == editor.cursor.line {
                        LINE_NUMBER_ACTIVE
                    } else {
                        LINE_NUMBER
                    };
                    queue!(stdout, SetForegroundColor(color))?;
                    queue!(stdout, Print(format!("{:>3} ", line_idx + 1)))?;
                }

                let line: String = editor
                    .buffer
                    .line(line_idx)
                    .chars()
                    .filter(|c| *c != '\n' && *c != '\r')
                    .collect();
                let line = fit_width(&line, text_width);
                queue!(stdout, ResetColor, Print(line))?;
            } else {
                queue!(stdout, SetForegroundColor(LINE_NUMBER), Print("~"))?;
            }
        }

        Ok(())
    }

    fn render_output(&self, stdout: &mut impl Write, editor: &Editor, top: u16) -> io::Result<()> {
        let title = if editor.is_running() {
            "─ output (running) "
        } else {
            "─ output "
        };
        let fill = (self.width as usize).saturating_sub(title.width());
        queue!(stdout, MoveTo(0, top), SetForegroundColor(SEPARATOR))?;
        queue!(stdout, Print(format!("{}{}", title, "─".repeat(fill))))?;

        let height = self.output_height(editor) as usize;
        // Newest lines stay visible
        let start = editor.output.len().saturating_sub(height);
        let visible = &editor.output[start..];

        for row in 0..height {
            let y = top + 1 + row as u16;
            queue!(stdout, MoveTo(0, y), Clear(ClearType::CurrentLine))?;
            if let Some(line) = visible.get(row) {
                let color = if line.starts_with("error: ") {
                    SetForegroundColor(OUTPUT_ERROR)
                } else {
                    SetForegroundColor(Color::Reset)
                };
                let text = fit_width(line, self.width as usize);
                queue!(stdout, color, Print(text))?;
            }
        }

        queue!(stdout, ResetColor)?;
        Ok(())
    }

    fn render_status_line(&self, stdout: &mut impl Write, editor: &Editor) -> io::Result<()> {
        let status_row = self.height.saturating_sub(1);
        queue!(stdout, MoveTo(0, status_row), Clear(ClearType::CurrentLine))?;

        match editor.mode {
            Mode::Command => {
                queue!(stdout, Print(format!(":{}", editor.command_buffer)))?;
                return Ok(());
            }
            Mode::Prompt => {
                if let Some(pending) = &editor.pending_input {
                    queue!(stdout, SetForegroundColor(PROMPT), SetAttribute(Attribute::Bold))?;
                    queue!(stdout, Print(format!("{}: ", pending.prompt)))?;
                    queue!(stdout, SetAttribute(Attribute::Reset), ResetColor)?;
                    queue!(stdout, Print(&pending.text))?;
                }
                return Ok(());
            }
            _ => {}
        }

        if let Some(ref msg) = editor.message {
            queue!(stdout, SetForegroundColor(MESSAGE), Print(msg), ResetColor)?;
            return Ok(());
        }

        let filename = editor
            .buffer
            .path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "[No Name]".to_string());
        let dirty = if editor.buffer.is_dirty() { " [+]" } else { "" };
        let left = format!(" {} | {}{} ", editor.mode.display(), filename, dirty);
        let right = format!(
            " {}:{} ",
            editor.cursor.line + 1,
            editor.cursor.col + 1
        );

        let width = self.width as usize;
        let padding = width.saturating_sub(left.width() + right.width());
        let status = fit_width(&format!("{}{}{}", left, " ".repeat(padding), right), width);

        queue!(
            stdout,
            SetBackgroundColor(STATUS_BG),
            SetForegroundColor(STATUS_FG),
            Print(status),
            ResetColor
        )?;
        Ok(())
    }

    fn position_cursor(&self, stdout: &mut impl Write, editor: &Editor) -> io::Result<()> {
        let status_row = self.height.saturating_sub(1);
        match editor.mode {
            Mode::Command => {
                let col = 1 + editor.command_buffer.width() as u16;
                queue!(stdout, MoveTo(col, status_row), SetCursorStyle::BlinkingBar)?;
            }
            Mode::Prompt => {
                let col = editor
                    .pending_input
                    .as_ref()
                    .map(|p| p.prompt.width() + 2 + p.text.width())
                    .unwrap_or(0) as u16;
                queue!(stdout, MoveTo(col, status_row), SetCursorStyle::BlinkingBar)?;
            }
            _ => {
                let x = self.gutter(editor) + editor.cursor_display_col() as u16;
                let y = editor.cursor.line.saturating_sub(editor.scroll_offset) as u16;
                let style = match editor.mode {
                    Mode::Insert => SetCursorStyle::BlinkingBar,
                    _ => SetCursorStyle::SteadyBlock,
                };
                queue!(stdout, MoveTo(x, y), style)?;
            }
        }
        queue!(stdout, Show)?;
        Ok(())
    }
}

/// Longest prefix of `text` that fits in `width` terminal cells
fn fit_width(text: &str, width: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_width_counts_cells() {
        assert_eq!(fit_width("hello", 3), "hel");
        assert_eq!(fit_width("말해바라~", 4), "말해");
        // A wide char that would straddle the edge is dropped
        assert_eq!(fit_width("말해바라~", 5), "말해");
        assert_eq!(fit_width("말해바라~", 20), "말해바라~");
        assert_eq!(fit_width("", 0), "");
    }
}
