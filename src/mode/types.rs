use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Loop-mitigation mode of a loop-topology run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopMode {
    NoMitigation,
    SpanningTree,
    ExternalController,
}

impl LoopMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            LoopMode::NoMitigation => "Without STP",
            LoopMode::SpanningTree => "With STP",
            LoopMode::ExternalController => "With POX Controller",
        }
    }

    /// Token used in capture, transcript and report file names
    pub fn label(&self) -> &'static str {
        match self {
            LoopMode::NoMitigation => "without_stp",
            LoopMode::SpanningTree => "with_stp",
            LoopMode::ExternalController => "with_pox",
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Phase of a NAT-topology run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NatMode {
    Unfixed,
    NatFixed,
}

impl NatMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            NatMode::Unfixed => "NAT (before fix)",
            NatMode::NatFixed => "NAT (after fix)",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NatMode::Unfixed => "nat_unfixed",
            NatMode::NatFixed => "nat_fixed",
        }
    }
}

impl fmt::Display for NatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Where the mitigation mechanism of a loop run currently stands.
///
/// `NoMitigation` stays `Unmitigated`; spanning tree goes
/// `Converging -> Converged`; the controller goes
/// `DiscoveringTopology -> Stable`. There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MitigationState {
    Unmitigated,
    Converging,
    Converged,
    DiscoveringTopology,
    Stable,
}

impl MitigationState {
    /// Returns true once probes may be issued
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            MitigationState::Unmitigated | MitigationState::Converged | MitigationState::Stable
        )
    }
}

/// Scenario selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Loop topology, no mitigation
    WithoutFixes,
    /// Loop topology with spanning tree enabled on every switch
    WithStp,
    /// Loop topology with switches attached to an external learning controller
    WithPox,
    /// NAT topology, measured before and after the translator is configured
    Nat,
}

impl RunMode {
    /// Loop mode for the loop scenarios, `None` for NAT
    pub fn loop_mode(&self) -> Option<LoopMode> {
        match self {
            RunMode::WithoutFixes => Some(LoopMode::NoMitigation),
            RunMode::WithStp => Some(LoopMode::SpanningTree),
            RunMode::WithPox => Some(LoopMode::ExternalController),
            RunMode::Nat => None,
        }
    }

    /// Name as typed on the command line
    pub fn cli_name(&self) -> &'static str {
        match self {
            RunMode::WithoutFixes => "without-fixes",
            RunMode::WithStp => "with-stp",
            RunMode::WithPox => "with-pox",
            RunMode::Nat => "nat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_unique() {
        let labels = [
            LoopMode::NoMitigation.label(),
            LoopMode::SpanningTree.label(),
            LoopMode::ExternalController.label(),
            NatMode::Unfixed.label(),
            NatMode::NatFixed.label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
        assert!(labels.iter().all(|l| !l.contains('-') && !l.contains(' ')));
    }

    #[test]
    fn test_run_mode_parsing() {
        assert_eq!(RunMode::from_str("with-stp", false).unwrap(), RunMode::WithStp);
        assert_eq!(RunMode::from_str("without-fixes", false).unwrap(), RunMode::WithoutFixes);
        assert!(RunMode::from_str("bogus", false).is_err());
        assert_eq!(RunMode::WithPox.loop_mode(), Some(LoopMode::ExternalController));
        assert_eq!(RunMode::Nat.loop_mode(), None);
        for mode in RunMode::value_variants() {
            assert_eq!(RunMode::from_str(mode.cli_name(), false).unwrap(), *mode);
        }
    }

    #[test]
    fn test_settled_states() {
        assert!(MitigationState::Unmitigated.is_settled());
        assert!(!MitigationState::Converging.is_settled());
        assert!(!MitigationState::DiscoveringTopology.is_settled());
        assert!(MitigationState::Stable.is_settled());
    }
}
