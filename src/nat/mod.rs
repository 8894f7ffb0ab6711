//! Address translation on the NAT topology's translator node.

pub mod provisioner;
pub mod rules;

pub use provisioner::{FixedTranslator, NatError, NatProvisioner, PrivateSide, TranslatorSpec, UnfixedTranslator};
pub use rules::{NatRule, NatRuleSet, PortForward, Protocol};
