//! Named computations shared by a helper and its execution unit.
//!
//! Code never crosses the isolation boundary. The helper ships a [`Descriptor`] (the registered
//! name) and the unit resolves it against the same [`Registry`], so a computation can only ever
//! reference what it was registered with.

use super::error::{ComputeError, WorkerError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A pure, named transformation that can be run off the owner's thread.
pub trait Computation: Send + Sync + 'static {
    /// Registry key. Must be unique within a registry.
    const NAME: &'static str;

    type Input: Serialize + DeserializeOwned + Send + 'static;
    type Output: Serialize + DeserializeOwned + Send + 'static;

    fn compute(&self, input: Self::Input) -> Result<Self::Output, ComputeError>;
}

/// Type-erased view of a [`Computation`] operating on JSON messages.
pub(crate) trait ErasedComputation: Send + Sync {
    fn call(&self, input: Value) -> Result<Value, WorkerError>;
}

impl<C: Computation> ErasedComputation for C {
    fn call(&self, input: Value) -> Result<Value, WorkerError> {
        let input: C::Input =
            serde_json::from_value(input).map_err(|e| WorkerError::Decode(e.to_string()))?;
        let output = self.compute(input).map_err(WorkerError::Computation)?;
        serde_json::to_value(output).map_err(|e| WorkerError::Encode(e.to_string()))
    }
}

/// Textual form of a computation, resolvable on the other side of the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    name: &'static str,
}

impl Descriptor {
    pub fn of<C: Computation>() -> Self {
        Self { name: C::NAME }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Immutable, cheaply cloneable set of registered computations.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<HashMap<&'static str, Arc<dyn ErasedComputation>>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        self.entries.contains_key(descriptor.name())
    }

    pub(crate) fn resolve(&self, descriptor: &Descriptor) -> Option<Arc<dyn ErasedComputation>> {
        self.entries.get(descriptor.name()).cloned()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("entries", &names).finish()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<&'static str, Arc<dyn ErasedComputation>>,
}

impl RegistryBuilder {
    /// Register `computation` under [`Computation::NAME`]. A later registration with the same
    /// name replaces the earlier one.
    pub fn register<C: Computation>(mut self, computation: C) -> Self {
        if self
            .entries
            .insert(C::NAME, Arc::new(computation))
            .is_some()
        {
            tracing::warn!(computation = C::NAME, "replacing registered computation");
        }
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            entries: Arc::new(self.entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Double;

    impl Computation for Double {
        const NAME: &'static str = "double";
        type Input = i64;
        type Output = i64;

        fn compute(&self, input: i64) -> Result<i64, ComputeError> {
            Ok(input * 2)
        }
    }

    #[test]
    fn resolves_registered_descriptor() {
        let registry = Registry::builder().register(Double).build();
        let descriptor = Descriptor::of::<Double>();
        assert!(registry.contains(&descriptor));

        let erased = registry.resolve(&descriptor).expect("registered");
        assert_eq!(erased.call(Value::from(21)), Ok(Value::from(42)));
    }

    #[test]
    fn unknown_descriptor_does_not_resolve() {
        let registry = Registry::default();
        assert!(registry.resolve(&Descriptor::of::<Double>()).is_none());
    }

    #[test]
    fn malformed_input_is_a_decode_error() {
        let registry = Registry::builder().register(Double).build();
        let erased = registry.resolve(&Descriptor::of::<Double>()).expect("registered");
        let err = erased.call(Value::from("not a number")).unwrap_err();
        assert!(matches!(err, WorkerError::Decode(_)));
    }
}
