//! Terminal and log reporting

pub mod progress;
pub mod summary;

pub use progress::{download_bar_style, Reporter};
pub use summary::{format_error_summary, ErrorRecord};
