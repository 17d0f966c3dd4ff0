use std::path::PathBuf;

/// Editor and interpreter settings that can be customized via Rhai config
#[derive(Debug, Clone)]
pub struct Settings {
    // Interpreter
    pub storage_dir: Option<PathBuf>, // None: <documents>/카피바라 저장소

    // Display
    pub show_line_numbers: bool,
    pub output_height: u16,
    pub clear_output_on_run: bool,

    // Editing
    pub tab_width: usize,
    pub insert_spaces: bool, // Use spaces instead of tabs
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: None,

            show_line_numbers: true,
            output_height: 8,
            clear_output_on_run: true,

            tab_width: 4,
            insert_spaces: true,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folder interpreter saves go to
    pub fn resolved_storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir
            .clone()
            .or_else(crate::interpreter::default_dir)
    }

    /// Text inserted for the Tab key
    pub fn indent_unit(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_width)
        } else {
            "\t".to_string()
        }
    }
}
