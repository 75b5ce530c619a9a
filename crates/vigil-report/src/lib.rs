pub mod html;
pub mod summary;

pub use html::{generate_html_report, save_report};
pub use summary::{format_duration, generate_summary, stats_summary};
