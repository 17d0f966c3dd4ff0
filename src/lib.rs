//! Capybara: a tiny keyword-triggered scripting language and its editor
//!
//! - `interpreter` runs scripts against injected display/input adapters
//! - `config` loads editor and interpreter settings from `init.rhai`

pub mod config;
pub mod interpreter;
