//! TUI module: Terminal User Interface using Ratatui.
//!
//! - Patient attribute form
//! - Per-model verdicts

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::ClinicalTheme;
