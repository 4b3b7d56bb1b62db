//! Undoable pipeline mutations.
//!
//! Every change to the committed [`Pipeline`] is a [`Command`]. Applying
//! a command hands back its inverse, which is what undo later applies;
//! redo re-applies the original command. The two stacks only ever hold
//! commands that were valid against the pipeline state they were
//! recorded at, so replaying them in stack order cannot go out of range.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::operation::OperationRef;
use crate::pipeline::Pipeline;
use crate::types::{OperationError, Params, PipelineError};

/// A reversible pipeline mutation.
#[derive(Debug, Clone)]
pub enum Command {
    /// Append an operation.
    Add(OperationRef),
    /// Insert an operation before `index` (`index == len` appends).
    Insert {
        /// Insertion position.
        index: usize,
        /// Operation to insert.
        operation: OperationRef,
    },
    /// Remove the operation at `index`.
    Remove {
        /// Position to remove.
        index: usize,
    },
    /// Swap the operation at `index` for another.
    Replace {
        /// Position to replace.
        index: usize,
        /// New operation.
        operation: OperationRef,
    },
    /// Move the operation at `from` so it ends up at `to`.
    Move {
        /// Current position.
        from: usize,
        /// Final position.
        to: usize,
    },
    /// Remove every operation.
    Clear,
    /// Replace the whole operation list.
    Set(Vec<OperationRef>),
}

impl Command {
    /// Short name for logs and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
            Self::Replace { .. } => "replace",
            Self::Move { .. } => "move",
            Self::Clear => "clear",
            Self::Set(_) => "set",
        }
    }

    /// Apply to `pipeline` and return the command that undoes it.
    ///
    /// Indices are validated before anything changes, so on error the
    /// pipeline is untouched.
    fn apply(&self, pipeline: &mut Pipeline) -> Result<Self, PipelineError> {
        let len = pipeline.len();
        let check = |index: usize, limit: usize| {
            if index < limit {
                Ok(())
            } else {
                Err(PipelineError::IndexOutOfRange { index, len })
            }
        };

        match self {
            Self::Add(operation) => {
                pipeline.push(operation.clone());
                Ok(Self::Remove { index: len })
            }
            Self::Insert { index, operation } => {
                check(*index, len + 1)?;
                pipeline.insert(*index, operation.clone());
                Ok(Self::Remove { index: *index })
            }
            Self::Remove { index } => {
                check(*index, len)?;
                let operation = pipeline.remove(*index);
                Ok(Self::Insert {
                    index: *index,
                    operation,
                })
            }
            Self::Replace { index, operation } => {
                check(*index, len)?;
                let previous = pipeline.replace(*index, operation.clone());
                Ok(Self::Replace {
                    index: *index,
                    operation: previous,
                })
            }
            Self::Move { from, to } => {
                check(*from, len)?;
                check(*to, len)?;
                let operation = pipeline.remove(*from);
                pipeline.insert(*to, operation);
                Ok(Self::Move {
                    from: *to,
                    to: *from,
                })
            }
            Self::Clear => Ok(Self::Set(pipeline.set(Vec::new()))),
            Self::Set(operations) => Ok(Self::Set(pipeline.set(operations.clone()))),
        }
    }
}

/// Undo stack limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo steps kept; `None` is unbounded.
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone)]
struct Entry {
    command: Command,
    inverse: Command,
}

/// The committed pipeline together with its undo and redo stacks.
#[derive(Debug, Clone, Default)]
pub struct History {
    pipeline: Pipeline,
    undo: Vec<Entry>,
    redo: Vec<Entry>,
    config: HistoryConfig,
}

impl History {
    /// Empty pipeline, empty stacks.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The committed pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Stack limits in effect.
    #[must_use]
    pub const fn config(&self) -> HistoryConfig {
        self.config
    }

    /// Apply `command` and record it for undo.
    ///
    /// Returns `Ok(false)` when the command was a no-op that is not
    /// recorded (clearing an empty pipeline). Any recorded command
    /// invalidates the redo stack.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IndexOutOfRange`] if the command names a
    /// stage that does not exist; neither the pipeline nor the stacks
    /// change.
    pub fn execute(&mut self, command: Command) -> Result<bool, PipelineError> {
        if matches!(command, Command::Clear) && self.pipeline.is_empty() {
            return Ok(false);
        }

        let inverse = command.apply(&mut self.pipeline)?;
        tracing::debug!(
            command = command.label(),
            len = self.pipeline.len(),
            "pipeline command executed"
        );
        self.redo.clear();
        self.undo.push(Entry { command, inverse });

        if let Some(max) = self.config.max_depth
            && self.undo.len() > max
        {
            let excess = self.undo.len() - max;
            self.undo.drain(..excess);
        }
        Ok(true)
    }

    /// Revert the most recent command. Returns `false` if there was
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.undo.pop() else {
            return false;
        };
        match entry.inverse.apply(&mut self.pipeline) {
            Ok(_) => {
                tracing::debug!(command = entry.command.label(), "undo");
                self.redo.push(entry);
                true
            }
            Err(err) => {
                tracing::error!(
                    command = entry.command.label(),
                    %err,
                    "undo entry no longer applies; dropped"
                );
                false
            }
        }
    }

    /// Re-apply the most recently undone command. Returns `false` if
    /// there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo.pop() else {
            return false;
        };
        match entry.command.apply(&mut self.pipeline) {
            Ok(inverse) => {
                tracing::debug!(command = entry.command.label(), "redo");
                self.undo.push(Entry {
                    command: entry.command,
                    inverse,
                });
                true
            }
            Err(err) => {
                tracing::error!(
                    command = entry.command.label(),
                    %err,
                    "redo entry no longer applies; dropped"
                );
                false
            }
        }
    }

    /// Returns `true` if [`undo`](Self::undo) would change anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Returns `true` if [`redo`](Self::redo) would change anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo steps available.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo steps available.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Replace the whole pipeline as one undoable step.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares [`execute`](Self::execute)'s
    /// signature.
    pub fn set_pipeline(&mut self, operations: Vec<OperationRef>) -> Result<bool, PipelineError> {
        self.execute(Command::Set(operations))
    }

    /// Clear the pipeline as one undoable step. Clearing an empty
    /// pipeline records nothing and returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares [`execute`](Self::execute)'s
    /// signature.
    pub fn clear_pipeline(&mut self) -> Result<bool, PipelineError> {
        self.execute(Command::Clear)
    }

    /// Independent copy of the pipeline, rebuilt through `catalog`.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::deep_clone`].
    pub fn clone_pipeline(&self, catalog: &Catalog) -> Result<Pipeline, OperationError> {
        self.pipeline.deep_clone(catalog)
    }

    /// Parameters of the latest committed operation of `kind`.
    #[must_use]
    pub fn get_operation_params(&self, kind: &str) -> Option<Params> {
        self.pipeline.get_operation_params(kind)
    }

    /// Drop the pipeline and both stacks.
    pub fn reset(&mut self) {
        self.pipeline = Pipeline::new();
        self.undo.clear();
        self.redo.clear();
    }
}
