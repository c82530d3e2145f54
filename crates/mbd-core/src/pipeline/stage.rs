//! Per-item stage state machine.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Selecting,
    Fetching,
    Muxing,
    Extracting,
    Tagging,
    Deriving,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Selecting => "selecting",
            Stage::Fetching => "fetching",
            Stage::Muxing => "muxing",
            Stage::Extracting => "extracting",
            Stage::Tagging => "tagging",
            Stage::Deriving => "deriving",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    /// Forward edges of the machine. `Failed` is reachable from every
    /// non-terminal stage.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Selecting, Fetching)
                | (Fetching, Muxing)
                | (Fetching, Extracting)
                | (Fetching, Done)
                | (Muxing, Extracting)
                | (Muxing, Done)
                | (Extracting, Tagging)
                | (Tagging, Deriving)
                | (Tagging, Done)
                | (Deriving, Done)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one item's walk through the stages and logs each transition.
#[derive(Debug)]
pub struct StageTracker {
    source: String,
    history: Vec<Stage>,
}

impl StageTracker {
    pub fn new(source: &str) -> Self {
        tracing::debug!(url = %source, stage = %Stage::Selecting, "item started");
        Self {
            source: source.to_string(),
            history: vec![Stage::Selecting],
        }
    }

    pub fn current(&self) -> Stage {
        self.history.last().copied().unwrap_or(Stage::Selecting)
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn advance(&mut self, next: Stage) {
        let from = self.current();
        if !from.can_advance_to(next) {
            tracing::warn!(url = %self.source, %from, to = %next, "unexpected stage transition");
        }
        tracing::debug!(url = %self.source, %from, to = %next, "stage");
        self.history.push(next);
    }

    /// Enter `Failed`, returning the stage the failure happened in.
    pub fn fail(&mut self) -> Stage {
        let at = self.current();
        self.advance(Stage::Failed);
        at
    }
}
