use std::path::{Path, PathBuf};

use ropey::{Rope, RopeSlice};

use capybara::interpreter;

/// Script text being edited, plus where it lives on disk
pub struct Buffer {
    text: Rope,
    filepath: Option<PathBuf>,
    dirty: bool,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            text: Rope::new(),
            filepath: None,
            dirty: false,
        }
    }

    pub fn from_text(s: &str) -> Self {
        Self {
            text: Rope::from_str(s),
            filepath: None,
            dirty: false,
        }
    }

    /// Load `path` into a fresh buffer
    pub fn open(path: PathBuf) -> interpreter::Result<Self> {
        let content = interpreter::load(&path)?;
        Ok(Self {
            text: Rope::from_str(&content),
            filepath: Some(path),
            dirty: false,
        })
    }

    /// An empty buffer that will be written to `path`
    pub fn new_file(path: PathBuf) -> Self {
        Self {
            text: Rope::new(),
            filepath: Some(path),
            dirty: false,
        }
    }

    /// Write the text, trimmed of surrounding whitespace, to `path` and
    /// remember it as this buffer's file
    pub fn save_as(&mut self, path: PathBuf) -> interpreter::Result<()> {
        interpreter::save(&path, self.text().trim())?;
        self.filepath = Some(path);
        self.dirty = false;
        Ok(())
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn path(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    pub fn line(&self, idx: usize) -> RopeSlice<'_> {
        self.text.line(idx)
    }

    /// Length of a line in chars, not counting its newline
    pub fn line_len(&self, idx: usize) -> usize {
        let line = self.text.line(idx);
        let len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    fn char_idx(&self, line: usize, col: usize) -> usize {
        self.text.line_to_char(line) + col
    }

    pub fn insert_str(&mut self, line: usize, col: usize, s: &str) {
        let idx = self.char_idx(line, col);
        self.text.insert(idx, s);
        self.dirty = true;
    }

    pub fn insert_char(&mut self, line: usize, col: usize, ch: char) {
        let idx = self.char_idx(line, col);
        self.text.insert_char(idx, ch);
        self.dirty = true;
    }

    /// Remove the char before (line, col), joining lines at column 0.
    /// Returns false at the very start of the buffer.
    pub fn backspace(&mut self, line: usize, col: usize) -> bool {
        let idx = self.char_idx(line, col);
        if idx == 0 {
            return false;
        }
        self.text.remove(idx - 1..idx);
        self.dirty = true;
        true
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_len_excludes_newline() {
        let buf = Buffer::from_text("말해바라~\n\nend");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line_len(0), 5);
        assert_eq!(buf.line_len(1), 0);
        assert_eq!(buf.line_len(2), 3);
    }

    #[test]
    fn insert_marks_dirty() {
        let mut buf = Buffer::from_text("ac");
        assert!(!buf.is_dirty());
        buf.insert_char(0, 1, 'b');
        assert_eq!(buf.text(), "abc");
        assert!(buf.is_dirty());
    }

    #[test]
    fn backspace_joins_lines() {
        let mut buf = Buffer::from_text("ab\ncd");
        assert!(buf.backspace(1, 0));
        assert_eq!(buf.text(), "abcd");
        assert!(!buf.backspace(0, 0));
    }

    #[test]
    fn save_as_trims_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.capybara");

        let mut buf = Buffer::from_text("\n  <카피바라~>\n<카피바라!>\n\n");
        buf.insert_char(0, 0, ' ');
        buf.save_as(path.clone()).unwrap();
        assert!(!buf.is_dirty());
        assert_eq!(buf.path(), Some(path.as_path()));

        let reopened = Buffer::open(path).unwrap();
        assert_eq!(reopened.text(), "<카피바라~>\n<카피바라!>");
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = Buffer::open(dir.path().join("missing.capybara"));
        assert!(matches!(result, Err(interpreter::Error::NotFound { .. })));
    }
}
