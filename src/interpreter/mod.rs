//! Capybara script interpreter
//!
//! A script is wrapped in [`OPEN_MARKER`] / [`CLOSE_MARKER`] and holds one
//! command per line. Commands are recognised by trigger words:
//! - `물어바라~` ask: show a quoted text, or the value of `( expr )`
//! - `적어바라~ name ("prompt")` read a whole number into `name`
//! - `연산을 선택해바라~ "덧셈"` pick an arithmetic operation
//! - `계산해바라~ ( expr )` compute and show a result
//! - `말해바라~ "text"` show text
//! - `변수바라~ name` declare a variable
//! - `저장바라~ name(content)` save content to the storage folder

mod command;
mod engine;
mod error;
mod expr;
mod io;
mod storage;
mod store;

pub use command::{Command, Operation};
pub use engine::Interpreter;
pub use error::{Error, EvalError, InputParseError, Result};
pub use expr::Number;
pub use io::{Console, InputSource, OutputSink, ScriptedInput, Transcript};
pub use storage::{default_dir, load, save, with_script_extension};
pub use store::{Slot, VariableStore};

/// Every script starts with this
pub const OPEN_MARKER: &str = "<카피바라~>";

/// Every script ends with this
pub const CLOSE_MARKER: &str = "<카피바라!>";
