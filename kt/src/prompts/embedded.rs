//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

use crate::domain::Phase;

/// Diagnostic phase instruction
pub const ASSESSMENT: &str = include_str!("../../prompts/assessment.pmt");

/// Plan-following phase instruction
pub const LEARNING: &str = include_str!("../../prompts/learning.pmt");

/// Post-chapter challenge instruction
pub const MASTERY: &str = include_str!("../../prompts/mastery.pmt");

/// Opening message shown before the first exchange
pub const GREETING: &str = include_str!("../../prompts/greeting.pmt");

/// Template name used for a phase's system instruction
pub fn template_for(phase: Phase) -> &'static str {
    match phase {
        Phase::Assessment => "assessment",
        Phase::Learning => "learning",
        Phase::Mastery => "mastery",
    }
}

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "assessment" => Some(ASSESSMENT),
        "learning" => Some(LEARNING),
        "mastery" => Some(MASTERY),
        "greeting" => Some(GREETING),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
