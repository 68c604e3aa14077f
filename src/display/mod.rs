//! Presentation collaborators fed by the pipeline.

pub mod console;

pub use console::{render_bar, render_line, ConsolePresenter, DEFAULT_BAR_WIDTH};
