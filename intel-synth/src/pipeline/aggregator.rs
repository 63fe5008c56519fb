//! Result aggregation
//!
//! Pure filter + join over search outcomes. Renderers consume only the
//! [`Aggregate`], never raw outcomes or queries, so output formats stay
//! decoupled from how results were gathered.

use crate::types::SearchOutcome;

/// Successful findings in original order, plus the rendering corpus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    entries: Vec<SearchOutcome>,
    corpus: String,
    total: usize,
}

impl Aggregate {
    pub fn entries(&self) -> &[SearchOutcome] {
        &self.entries
    }

    /// Joined `QUERY/INTENT/RESULT` blocks
    pub fn corpus(&self) -> &str {
        &self.corpus
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcomes seen, successful or not
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn success_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.entries.len() as f64 / self.total as f64
        }
    }
}

/// Keep successful outcomes and join them into the corpus
pub fn aggregate(outcomes: &[SearchOutcome]) -> Aggregate {
    let entries: Vec<SearchOutcome> = outcomes.iter().filter(|o| o.success).cloned().collect();

    let corpus = entries
        .iter()
        .map(format_block)
        .collect::<Vec<_>>()
        .join("\n");

    Aggregate {
        entries,
        corpus,
        total: outcomes.len(),
    }
}

fn format_block(outcome: &SearchOutcome) -> String {
    format!(
        "QUERY: {}\nINTENT: {}\nRESULT:\n{}\n---",
        outcome.query, outcome.intent, outcome.response
    )
}
