//! Terminal dashboard

mod layout;
pub mod widgets;

pub use layout::{draw, RunInfo, UiState};
