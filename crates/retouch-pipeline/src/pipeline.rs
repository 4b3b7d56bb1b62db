//! The committed operation pipeline.
//!
//! A [`Pipeline`] is the ordered list of operations that reproduces the
//! current non-preview image. Outside this crate it is read-only; every
//! mutation goes through a [`Command`](crate::history::Command) so it
//! can be undone.
//!
//! Cloning a `Pipeline` with [`Clone`] shares the (immutable) operation
//! instances and is what render snapshots use. [`Pipeline::deep_clone`]
//! rebuilds every operation from its parameters through the catalog and
//! is what "duplicate pipeline" uses.

use std::fmt;

use crate::catalog::Catalog;
use crate::operation::{OperationRef, kinds_match};
use crate::types::{OperationError, Params};

/// Ordered sequence of committed operations.
#[derive(Clone, Default)]
pub struct Pipeline {
    operations: Vec<OperationRef>,
}

impl Pipeline {
    /// An empty pipeline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// A pipeline holding `operations` in order.
    #[must_use]
    pub const fn from_operations(operations: Vec<OperationRef>) -> Self {
        Self { operations }
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if the pipeline has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The operation at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&OperationRef> {
        self.operations.get(index)
    }

    /// All operations in application order.
    #[must_use]
    pub fn operations(&self) -> &[OperationRef] {
        &self.operations
    }

    /// Iterate operations in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, OperationRef> {
        self.operations.iter()
    }

    /// Kind names in application order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.operations.iter().map(|op| op.kind()).collect()
    }

    /// Parameters of the most recent operation of `kind`.
    ///
    /// Scans back to front so a reopened adjustment dialog can pre-fill
    /// the values it was last committed with. Kind names are compared
    /// case- and separator-insensitively.
    #[must_use]
    pub fn get_operation_params(&self, kind: &str) -> Option<Params> {
        self.operations
            .iter()
            .rev()
            .find(|op| kinds_match(op.kind(), kind))
            .map(|op| op.params())
    }

    /// Rebuild every operation from its own parameter map.
    ///
    /// The result shares no operation instances with `self`.
    ///
    /// # Errors
    ///
    /// Returns the first [`OperationError`] raised while rebuilding, e.g.
    /// when `catalog` lacks one of the kinds.
    pub fn deep_clone(&self, catalog: &Catalog) -> Result<Self, OperationError> {
        self.operations
            .iter()
            .map(|op| catalog.rebuild(op.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_operations)
    }

    pub(crate) fn push(&mut self, operation: OperationRef) {
        self.operations.push(operation);
    }

    pub(crate) fn insert(&mut self, index: usize, operation: OperationRef) {
        self.operations.insert(index, operation);
    }

    pub(crate) fn remove(&mut self, index: usize) -> OperationRef {
        self.operations.remove(index)
    }

    pub(crate) fn replace(&mut self, index: usize, operation: OperationRef) -> OperationRef {
        std::mem::replace(&mut self.operations[index], operation)
    }

    pub(crate) fn set(&mut self, operations: Vec<OperationRef>) -> Vec<OperationRef> {
        std::mem::replace(&mut self.operations, operations)
    }
}

/// Two pipelines are equal when they hold the same kinds with the same
/// parameters in the same order.
impl PartialEq for Pipeline {
    fn eq(&self, other: &Self) -> bool {
        self.operations.len() == other.operations.len()
            && self
                .operations
                .iter()
                .zip(&other.operations)
                .all(|(a, b)| a.kind() == b.kind() && a.params() == b.params())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.operations.iter().map(|op| (op.kind(), op.params())))
            .finish()
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a OperationRef;
    type IntoIter = std::slice::Iter<'a, OperationRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
