//! Capture and transcript file naming.
//!
//! Names are unique per (source, target, attempt, label), so repeated runs
//! into the same directory only overwrite files of the same trial.

use std::path::{Path, PathBuf};

use crate::analysis::TranscriptName;

/// Capture recorded at the probe's source
pub fn source_capture(dir: &Path, source: &str, target: &str, attempt: u32, label: &str) -> PathBuf {
    dir.join(format!("{}_to_{}_attempt{}_{}.pcap", source, target, attempt, label))
}

/// Capture recorded at the probe's target
pub fn target_capture(dir: &Path, source: &str, target: &str, attempt: u32, label: &str) -> PathBuf {
    dir.join(format!("{}_from_{}_attempt{}_{}.pcap", target, source, attempt, label))
}

/// Raw probe output saved next to the captures
pub fn transcript(dir: &Path, source: &str, target: &str, attempt: u32, label: &str) -> PathBuf {
    dir.join(TranscriptName::new(source, target, attempt, label).file_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let dir = Path::new("/tmp/caps");
        assert_eq!(
            source_capture(dir, "h3", "h1", 2, "with_stp"),
            PathBuf::from("/tmp/caps/h3_to_h1_attempt2_with_stp.pcap")
        );
        assert_eq!(
            target_capture(dir, "h3", "h1", 2, "with_stp"),
            PathBuf::from("/tmp/caps/h1_from_h3_attempt2_with_stp.pcap")
        );
        assert_eq!(
            transcript(dir, "h3", "h1", 2, "with_stp"),
            PathBuf::from("/tmp/caps/h3_to_h1_attempt2_with_stp.ping.txt")
        );
    }

    #[test]
    fn test_names_differ_per_attempt_and_label() {
        let dir = Path::new(".");
        let a = source_capture(dir, "h8", "h2", 1, "without_stp");
        assert_ne!(a, source_capture(dir, "h8", "h2", 2, "without_stp"));
        assert_ne!(a, source_capture(dir, "h8", "h2", 1, "with_stp"));
        assert_ne!(a, target_capture(dir, "h8", "h2", 1, "without_stp"));
    }
}
