//! Probe result analysis.
//!
//! Turns raw ping transcripts into structured trial results, aggregates them
//! per test, and writes run reports.

pub mod types;
pub mod ping_parser;
pub mod summary;
pub mod transcripts;
pub mod report;

pub use types::*;
pub use ping_parser::analyze;
pub use transcripts::{analyze_transcripts, TranscriptError, TranscriptName};
pub use report::{generate_json_report, generate_text_report, render_summary};
