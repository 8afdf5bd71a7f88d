//! Study output: artifact files and human-readable tables.

pub mod artifacts;
pub mod markdown;
pub mod text;

pub use artifacts::{save_artifacts, ArtifactPaths, RunManifest};
pub use markdown::render_markdown;
pub use text::{format_p, render_battery_table, render_rolling_summary, render_windows};
