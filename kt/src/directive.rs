//! Directive markers embedded in model replies
//!
//! Markers are plain literal substrings the prompts ask the model to emit.
//! Matching is case-sensitive substring search with no escaping, so any text
//! the model produces that happens to contain a marker is treated as the
//! directive. Only assistant text is ever scanned.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Marker signalling the assessment is over and the reply holds the study plan
pub const PLAN_READY_MARKER: &str = "[PLAN_READY]";

/// Marker signalling the reply holds an updated course summary
pub const RESUME_UPDATE_MARKER: &str = "[RESUME_UPDATE]";

/// The marker vocabulary shared between prompts and tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectiveMarkers {
    #[serde(rename = "plan-ready")]
    pub plan_ready: String,

    #[serde(rename = "resume-update")]
    pub resume_update: String,
}

impl Default for DirectiveMarkers {
    fn default() -> Self {
        Self {
            plan_ready: PLAN_READY_MARKER.to_string(),
            resume_update: RESUME_UPDATE_MARKER.to_string(),
        }
    }
}

impl DirectiveMarkers {
    /// Every recognized marker, in stripping order
    pub fn all(&self) -> [&str; 2] {
        [self.plan_ready.as_str(), self.resume_update.as_str()]
    }

    /// Check the vocabulary is usable: no empty marker, neither marker inside the other
    pub fn validate(&self) -> Result<(), String> {
        if self.plan_ready.is_empty() || self.resume_update.is_empty() {
            return Err("Directive markers must not be empty".to_string());
        }
        if self.plan_ready.contains(&self.resume_update) || self.resume_update.contains(&self.plan_ready) {
            return Err(format!(
                "Directive markers must not contain one another ('{}', '{}')",
                self.plan_ready, self.resume_update
            ));
        }
        Ok(())
    }
}

/// Literal substring search for a marker
///
/// An empty marker never matches.
pub fn contains_directive(text: &str, marker: &str) -> bool {
    !marker.is_empty() && text.contains(marker)
}

/// Remove every literal occurrence of every marker, in the order given
///
/// Removal repeats until no marker is left, so text like
/// `"[PLAN_[PLAN_READY]READY]"` does not leave a marker behind.
pub fn strip_directive(text: &str, markers: &[&str]) -> String {
    debug!(text_len = text.len(), marker_count = markers.len(), "strip_directive: called");
    let mut out = text.to_string();
    loop {
        let mut removed = false;
        for marker in markers.iter().copied().filter(|m| !m.is_empty()) {
            if out.contains(marker) {
                out = out.replace(marker, "");
                removed = true;
            }
        }
        if !removed {
            break;
        }
    }
    out
}
