use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rhai::{AST, Engine, EvalAltResult, ParseError, Scope};
use thiserror::Error;

use super::Settings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("config error: {0}")]
    Runtime(#[from] Box<EvalAltResult>),
}

/// The Rhai scripting engine for configuration
pub struct ConfigEngine {
    engine: Engine,
    settings: Arc<RwLock<Settings>>,
    ast: Option<AST>,
}

impl ConfigEngine {
    pub fn new() -> Self {
        let settings = Arc::new(RwLock::new(Settings::default()));
        let engine = Self::create_engine(Arc::clone(&settings));

        Self {
            engine,
            settings,
            ast: None,
        }
    }

    fn create_engine(settings: Arc<RwLock<Settings>>) -> Engine {
        let mut engine = Engine::new();

        // Limit script execution for safety
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_storage_dir", move |path: &str| {
                if let Ok(mut settings) = s.write() {
                    settings.storage_dir = Some(PathBuf::from(path));
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("get_storage_dir", move || -> String {
                s.read()
                    .ok()
                    .and_then(|s| s.resolved_storage_dir())
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_tab_width", move |width: i64| {
                if let Ok(mut settings) = s.write() {
                    settings.tab_width = width.clamp(1, 16) as usize;
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("get_tab_width", move || -> i64 {
                s.read().map(|s| s.tab_width as i64).unwrap_or(4)
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_insert_spaces", move |enabled: bool| {
                if let Ok(mut settings) = s.write() {
                    settings.insert_spaces = enabled;
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_show_line_numbers", move |enabled: bool| {
                if let Ok(mut settings) = s.write() {
                    settings.show_line_numbers = enabled;
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_output_height", move |height: i64| {
                if let Ok(mut settings) = s.write() {
                    settings.output_height = height.clamp(1, 50) as u16;
                }
            });
        }

        {
            let s = Arc::clone(&settings);
            engine.register_fn("set_clear_output_on_run", move |enabled: bool| {
                if let Ok(mut settings) = s.write() {
                    settings.clear_output_on_run = enabled;
                }
            });
        }

        engine.register_fn("print", |msg: &str| {
            tracing::info!(target: "capybara::config", "{}", msg);
        });

        engine
    }

    /// Load and execute a config file
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.eval(&content)
    }

    /// Evaluate a Rhai script string
    pub fn eval(&mut self, script: &str) -> Result<(), ConfigError> {
        let ast = self.engine.compile(script)?;

        let mut scope = Scope::new();
        self.engine.run_ast_with_scope(&mut scope, &ast)?;

        self.ast = Some(ast);
        Ok(())
    }

    /// Get the current settings (cloned)
    pub fn settings(&self) -> Settings {
        self.settings.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("capybara"))
    }

    /// Get the default config file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("init.rhai"))
    }

    /// Load the default config file if it exists
    pub fn load_default(&mut self) -> Result<(), ConfigError> {
        if let Some(config_file) = Self::config_file() {
            if config_file.exists() {
                return self.load_file(&config_file);
            }
        }
        Ok(()) // No config file is fine
    }
}

impl Default for ConfigEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_storage_dir() {
        let mut engine = ConfigEngine::new();
        engine.eval(r#"set_storage_dir("/tmp/capybara");"#).unwrap();
        assert_eq!(
            engine.settings().storage_dir,
            Some(PathBuf::from("/tmp/capybara"))
        );
    }

    #[test]
    fn test_get_storage_dir_reflects_override() {
        let mut engine = ConfigEngine::new();
        engine
            .eval(
                r#"
                set_storage_dir("/srv/scripts");
                if get_storage_dir() != "/srv/scripts" {
                    throw "storage dir not applied";
                }
            "#,
            )
            .unwrap();
    }

    #[test]
    fn test_set_tab_width_clamped() {
        let mut engine = ConfigEngine::new();
        engine.eval("set_tab_width(100);").unwrap();
        assert_eq!(engine.settings().tab_width, 16); // Clamped to max
    }

    #[test]
    fn test_set_output_height_clamped() {
        let mut engine = ConfigEngine::new();
        engine.eval("set_output_height(0);").unwrap();
        assert_eq!(engine.settings().output_height, 1);
    }

    #[test]
    fn test_multiple_settings() {
        let mut engine = ConfigEngine::new();
        engine
            .eval(
                r#"
                set_tab_width(2);
                set_insert_spaces(false);
                set_show_line_numbers(false);
                set_clear_output_on_run(false);
                print("loaded");
            "#,
            )
            .unwrap();

        let settings = engine.settings();
        assert_eq!(settings.tab_width, 2);
        assert!(!settings.insert_spaces);
        assert!(!settings.show_line_numbers);
        assert!(!settings.clear_output_on_run);
        assert_eq!(settings.indent_unit(), "\t");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let mut engine = ConfigEngine::new();
        let err = engine.eval("set_tab_width(").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_function_is_runtime_error() {
        let mut engine = ConfigEngine::new();
        let err = engine.eval(r#"set_font("mono");"#).unwrap_err();
        assert!(matches!(err, ConfigError::Runtime(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init.rhai");
        std::fs::write(&path, "set_output_height(12);").unwrap();

        let mut engine = ConfigEngine::new();
        engine.load_file(&path).unwrap();
        assert_eq!(engine.settings().output_height, 12);
    }

    #[test]
    fn test_load_missing_file() {
        let mut engine = ConfigEngine::new();
        let err = engine
            .load_file(Path::new("/definitely/not/here/init.rhai"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
