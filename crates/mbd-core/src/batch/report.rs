use crate::pipeline::{ItemFailure, StageResult};

/// One entry per item that survived discovery, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub results: Vec<StageResult>,
    /// Sources dropped before any stage ran (discovery failed or returned
    /// no variants). Logged only; not failures.
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.results.iter().filter_map(StageResult::failure)
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// `<source>: <message>` per failed item.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures()
            .map(|f| format!("{}: {}", f.source, f.message))
            .collect()
    }

    /// Warnings attached to successful items (e.g. a missing waveform).
    pub fn warning_lines(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| match r {
                StageResult::Success(s) => s.warning.as_ref().map(|w| format!("{}: {}", s.source, w)),
                StageResult::Failure(_) => None,
            })
            .collect()
    }
}
