//! Configuration loaded from `init.rhai`
//!
//! Usage in Rhai:
//! ```rhai
//! set_storage_dir("/home/me/capybara");
//! set_tab_width(2);
//! set_output_height(12);
//! ```

mod engine;
mod settings;

pub use engine::{ConfigEngine, ConfigError};
pub use settings::Settings;
