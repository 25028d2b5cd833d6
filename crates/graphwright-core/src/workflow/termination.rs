//! Routing predicates of the code-generation graph.

use super::graph::Transition;
use super::{FIX_CODE, GENERATE_CODE, INTERPRET_IMAGE};
use crate::conversation::{Author, Conversation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How the lint/fix loop decides to stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationMode {
    /// Stop on a clean lint or once the retry cap is reached.
    #[default]
    Corrected,
    /// Stop after the first lint, whatever it reported.
    Legacy,
}

impl fmt::Display for TerminationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrected => f.write_str("corrected"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for TerminationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "corrected" => Ok(Self::Corrected),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown termination mode '{other}' (expected corrected or legacy)")),
        }
    }
}

/// Routes a fresh request: diagrams go to the interpreter, text straight to
/// the generator.
#[must_use]
pub fn pick_route(conversation: &Conversation) -> Transition {
    if conversation.last().is_some_and(|m| m.has_image()) {
        Transition::goto(INTERPRET_IMAGE)
    } else {
        Transition::goto(GENERATE_CODE)
    }
}

/// Decides whether the code goes back to the fixer after a lint.
///
/// The retry count is the number of reviewer messages in the whole
/// conversation.
#[must_use]
pub fn should_regenerate(conversation: &Conversation, max_tries: usize, mode: TerminationMode) -> Transition {
    let reviews = conversation.reviewer_count();
    let lint_failed = conversation.last().is_some_and(|m| m.author == Author::CodeReviewer);

    let stop = match mode {
        TerminationMode::Legacy => true,
        TerminationMode::Corrected => !lint_failed || reviews >= max_tries,
    };

    debug!(reviews, max_tries, lint_failed, mode = %mode, stop, "Evaluated lint outcome");

    if stop {
        Transition::End
    } else {
        Transition::goto(FIX_CODE)
    }
}
