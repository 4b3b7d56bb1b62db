//! Name → constructor registry for operations.
//!
//! The render engine, persistence and the preview path never name a
//! concrete operation type. They ask the [`Catalog`] to build one from a
//! kind string and a parameter map, which keeps the set of operations
//! open without reflection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::operation::{Operation, OperationRef, normalize_kind};
use crate::ops;
use crate::types::{OperationError, Params};

/// Constructor for one operation kind.
pub type Factory = fn(&Params) -> Result<Box<dyn Operation>, OperationError>;

#[derive(Clone)]
struct Entry {
    name: String,
    factory: Factory,
}

/// Registry of operation factories keyed by normalized kind.
#[derive(Clone)]
pub struct Catalog {
    entries: BTreeMap<String, Entry>,
}

impl Catalog {
    /// An empty catalog.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Catalog with every built-in operation registered.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        ops::register_builtin(&mut catalog);
        catalog
    }

    /// Register (or replace) a factory under `name`.
    pub fn register(&mut self, name: &str, factory: Factory) {
        self.entries.insert(
            normalize_kind(name),
            Entry {
                name: name.to_owned(),
                factory,
            },
        );
    }

    /// Returns `true` if `kind` resolves to a registered factory.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(&normalize_kind(kind))
    }

    /// Registered kind names, in normalized order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|e| e.name.as_str())
    }

    /// Build an operation of `kind` from `params`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::UnknownKind`] if nothing is registered
    /// under `kind`, or whatever the factory reports for bad parameters.
    pub fn create(&self, kind: &str, params: &Params) -> Result<OperationRef, OperationError> {
        let entry = self
            .entries
            .get(&normalize_kind(kind))
            .ok_or_else(|| OperationError::UnknownKind(kind.to_owned()))?;
        (entry.factory)(params).map(Arc::from)
    }

    /// Reconstruct an independent copy of `operation` from its own
    /// parameter map.
    ///
    /// # Errors
    ///
    /// Fails like [`create`](Self::create) if the kind is not registered
    /// here or the parameters no longer validate.
    pub fn rebuild(&self, operation: &dyn Operation) -> Result<OperationRef, OperationError> {
        self.create(operation.kind(), &operation.params())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::DynamicImage;

    #[derive(Debug)]
    struct Identity;

    impl Operation for Identity {
        fn kind(&self) -> &'static str {
            "identity"
        }

        fn params(&self) -> Params {
            Params::new()
        }

        fn apply(&self, image: &DynamicImage, _: f64) -> Result<DynamicImage, OperationError> {
            Ok(image.clone())
        }
    }

    #[allow(clippy::unnecessary_wraps)]
    fn identity(_: &Params) -> Result<Box<dyn Operation>, OperationError> {
        Ok(Box::new(Identity))
    }

    #[test]
    fn builtin_registers_core_kinds() {
        let catalog = Catalog::builtin();
        for kind in ["grayscale", "threshold", "brightness_contrast", "gaussian_blur"] {
            assert!(catalog.contains(kind), "missing {kind}");
        }
    }

    #[test]
    fn lookup_is_case_and_underscore_insensitive() {
        let catalog = Catalog::builtin();
        let op = catalog.create("Brightness-Contrast", &Params::new()).unwrap();
        assert_eq!(op.kind(), "brightness_contrast");
    }

    #[test]
    fn unknown_kind_is_reported() {
        let err = Catalog::builtin()
            .create("posterize_deluxe", &Params::new())
            .unwrap_err();
        assert_eq!(err, OperationError::UnknownKind("posterize_deluxe".into()));
    }

    #[test]
    fn registered_factories_are_reachable() {
        let mut catalog = Catalog::empty();
        assert!(!catalog.contains("identity"));
        catalog.register("identity", identity);
        assert!(catalog.contains("IDENTITY"));
        assert_eq!(catalog.kinds().collect::<Vec<_>>(), vec!["identity"]);
    }

    #[test]
    fn rebuild_produces_equal_params() {
        let catalog = Catalog::builtin();
        let op = catalog
            .create("threshold", &Params::new().with("level", 90))
            .unwrap();
        let copy = catalog.rebuild(op.as_ref()).unwrap();
        assert_eq!(op.params(), copy.params());
        assert!(!Arc::ptr_eq(&op, &copy));
    }
}
