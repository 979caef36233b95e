//! Run-decision capability.
//!
//! When a local artifact already exists the pipeline must decide between a
//! full refresh (re-download, reset progress, discard output) and a resume.
//! The decision comes from a [`DecisionProvider`] so the interactive terminal
//! prompt can be swapped for a scripted answer (CLI flags, tests) without
//! touching the pipeline.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

/// How a run should treat an existing artifact and prior progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDecision {
    /// Re-download the artifact, reset the progress marker, discard the CSV.
    FullRefresh,
    /// Keep the artifact and continue from the saved progress marker.
    Resume,
}

impl RunDecision {
    /// Parses a normalized user answer. `yes` means full refresh, `no` means
    /// resume; anything else is rejected so the prompt can re-ask.
    #[must_use]
    pub fn from_answer(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::FullRefresh),
            "no" => Some(Self::Resume),
            _ => None,
        }
    }
}

/// Supplies the run decision for one invocation.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Produces exactly one decision.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the decision source is unavailable (for the
    /// terminal prompt: stdin closed before a valid answer).
    async fn run_decision(&self) -> io::Result<RunDecision>;
}

/// Interactive yes/no prompt on the controlling terminal.
///
/// Invalid input is re-requested rather than defaulted.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait]
impl DecisionProvider for TerminalPrompt {
    async fn run_decision(&self) -> io::Result<RunDecision> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            stdout
                .write_all(b"Will you update the database? (yes/no): ")
                .await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stdin closed before a yes/no answer",
                ));
            };

            if let Some(decision) = RunDecision::from_answer(&line) {
                debug!(?decision, "run decision entered");
                return Ok(decision);
            }
            stdout.write_all(b"Please enter \"yes\" or \"no\".\n").await?;
        }
    }
}

/// Fixed decision for non-interactive runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedDecision(pub RunDecision);

#[async_trait]
impl DecisionProvider for ScriptedDecision {
    async fn run_decision(&self) -> io::Result<RunDecision> {
        Ok(self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_answer_accepts_yes_and_no() {
        assert_eq!(
            RunDecision::from_answer("yes"),
            Some(RunDecision::FullRefresh)
        );
        assert_eq!(RunDecision::from_answer("no"), Some(RunDecision::Resume));
    }

    #[test]
    fn test_from_answer_normalizes_case_and_whitespace() {
        assert_eq!(
            RunDecision::from_answer("  YES \n"),
            Some(RunDecision::FullRefresh)
        );
        assert_eq!(RunDecision::from_answer("No"), Some(RunDecision::Resume));
    }

    #[test]
    fn test_from_answer_rejects_everything_else() {
        assert_eq!(RunDecision::from_answer(""), None);
        assert_eq!(RunDecision::from_answer("y"), None);
        assert_eq!(RunDecision::from_answer("nope"), None);
        assert_eq!(RunDecision::from_answer("ja"), None);
    }

    #[tokio::test]
    async fn test_scripted_decision_returns_fixed_value() {
        let provider = ScriptedDecision(RunDecision::Resume);
        assert_eq!(provider.run_decision().await.unwrap(), RunDecision::Resume);
    }
}
