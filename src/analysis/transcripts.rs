//! Offline analysis of saved probe transcripts.
//!
//! The harness stores each probe's raw text next to the packet captures as
//! `{source}_to_{target}_attempt{N}_{label}.ping.txt`. This module finds those
//! files, analyzes them in parallel and regroups them into test summaries.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;

use super::ping_parser::analyze;
use super::types::{TestSummary, TrialResult};

/// Suffix of saved probe transcripts
pub const TRANSCRIPT_SUFFIX: &str = ".ping.txt";

static TRANSCRIPT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^_]+)_to_([^_]+)_attempt(\d+)_(.+)\.ping\.txt$")
        .expect("Invalid transcript name regex")
});

/// Errors raised while reading transcripts
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Identity of one saved transcript
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TranscriptName {
    pub source: String,
    pub target: String,
    /// One-based attempt index
    pub attempt: u32,
    pub label: String,
}

impl TranscriptName {
    pub fn new(source: &str, target: &str, attempt: u32, label: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            attempt,
            label: label.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_to_{}_attempt{}_{}{}",
            self.source, self.target, self.attempt, self.label, TRANSCRIPT_SUFFIX
        )
    }

    /// Parse a file name produced by `file_name`
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = TRANSCRIPT_NAME.captures(file_name)?;
        Some(Self {
            source: caps.get(1)?.as_str().to_string(),
            target: caps.get(2)?.as_str().to_string(),
            attempt: caps.get(3)?.as_str().parse().ok()?,
            label: caps.get(4)?.as_str().to_string(),
        })
    }
}

fn read_dir_names(dir: &Path) -> Result<Vec<(TranscriptName, PathBuf)>, TranscriptError> {
    let io_err = |source| TranscriptError::Io { path: dir.to_path_buf(), source };
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str().and_then(TranscriptName::parse) else {
            continue;
        };
        found.push((name, entry.path()));
    }
    Ok(found)
}

/// Analyze every transcript in `dir`, optionally only those with `label`,
/// and return one summary per (label, source, target), trials in attempt order.
pub fn analyze_transcripts(dir: &Path, label: Option<&str>) -> Result<Vec<TestSummary>, TranscriptError> {
    let mut names = read_dir_names(dir)?;
    if let Some(label) = label {
        names.retain(|(name, _)| name.label == label);
    }
    log::info!("Analyzing {} transcripts in {}", names.len(), dir.display());

    let analyzed: Vec<(TranscriptName, TrialResult)> = names
        .into_par_iter()
        .map(|(name, path)| {
            let text = fs::read_to_string(&path)
                .map_err(|source| TranscriptError::Io { path: path.clone(), source })?;
            Ok((name, analyze(&text)))
        })
        .collect::<Result<_, TranscriptError>>()?;

    let mut grouped: BTreeMap<(String, String, String), Vec<(u32, TrialResult)>> = BTreeMap::new();
    for (name, trial) in analyzed {
        grouped
            .entry((name.label, name.source, name.target))
            .or_default()
            .push((name.attempt, trial));
    }

    Ok(grouped
        .into_iter()
        .map(|((label, source, target), mut trials)| {
            trials.sort_by_key(|(attempt, _)| *attempt);
            let test_name = format!("Ping {} from {} ({})", target, source, label);
            let trials = trials.into_iter().map(|(_, t)| t).collect();
            TestSummary::from_trials(test_name, source, target, trials)
        })
        .collect())
}
