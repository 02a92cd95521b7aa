//! Aggregated problem reporting.
//!
//! Every check appends human-readable problems keyed by a label, usually a
//! root-relative file path. Rendering groups problems into one block per
//! label, prefixed with the label and a count. A run succeeds iff the
//! report stays clean; auto-fixes also land here so a repairing run still
//! fails and a second run confirms convergence.

use std::fmt;

/// Problems collected for one label.
#[derive(Debug, Clone)]
pub struct FileBlock {
    pub label: String,
    pub problems: Vec<String>,
}

/// Aggregate of all problems found in one run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    blocks: Vec<FileBlock>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one problem under `label`, keeping first-seen label order.
    pub fn add_problem(&mut self, label: impl Into<String>, message: impl Into<String>) {
        let label = label.into();
        let message = message.into();
        match self.blocks.iter_mut().find(|b| b.label == label) {
            Some(block) => block.problems.push(message),
            None => self.blocks.push(FileBlock {
                label,
                problems: vec![message],
            }),
        }
    }

    /// Folds another report's blocks into this one.
    pub fn merge(&mut self, other: Report) {
        for block in other.blocks {
            for problem in block.problems {
                self.add_problem(block.label.clone(), problem);
            }
        }
    }

    /// True when no check reported anything.
    pub fn is_clean(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn problem_count(&self) -> usize {
        self.blocks.iter().map(|b| b.problems.len()).sum()
    }

    pub fn blocks(&self) -> &[FileBlock] {
        &self.blocks
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}: {} problem(s)", block.label, block.problems.len())?;
            for problem in &block.problems {
                writeln!(f, "  - {}", problem)?;
            }
        }
        Ok(())
    }
}
