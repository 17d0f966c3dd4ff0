mod buffer;
mod editor;
mod mode;
mod run;

pub use buffer::Buffer;
pub use editor::Editor;
pub use mode::Mode;
pub use run::RunEvent;
