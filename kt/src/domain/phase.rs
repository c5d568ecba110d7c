//! Learner phase within one chapter

use serde::{Deserialize, Serialize};

/// Coarse progress state of a learner in a chapter
///
/// Ordered `Assessment < Learning < Mastery`; a session's phase never moves
/// backwards in this ordering. Nothing in the tracker moves a session into
/// `Mastery`, it exists so sessions can be created in it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Diagnostic questioning, no study plan yet
    #[default]
    Assessment,
    /// Following the study plan
    Learning,
    /// Chapter mastered
    Mastery,
}

impl Phase {
    /// All phases in progression order
    pub const ALL: [Phase; 3] = [Phase::Assessment, Phase::Learning, Phase::Mastery];

    /// Lowercase name, also used as the prompt template name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assessment => "assessment",
            Self::Learning => "learning",
            Self::Mastery => "mastery",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
