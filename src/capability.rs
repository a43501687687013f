//! Capability hooks that let a family's top type decide membership tests.
//!
//! Every family carries a [`Capabilities`] value with two hooks:
//! `conformable_is_instance` and `conformable_is_subtype`. A hook answers
//! with a [`Conformance`]; [`Conformance::Fallback`] hands the decision back
//! to the nominal type system for that one call.

use std::fmt;
use std::sync::Arc;

use crate::construct::{Class, Instance};

pub const IS_INSTANCE_HOOK: &str = "conformable_is_instance";
pub const IS_SUBTYPE_HOOK: &str = "conformable_is_subtype";

/// Answer of a capability hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conformance {
    Conforming,
    NonConforming,
    Fallback,
}

impl Conformance {
    /// Resolves the answer, consulting `nominal` only when the hook deferred.
    pub fn resolve(self, nominal: impl FnOnce() -> bool) -> bool {
        match self {
            Conformance::Conforming => true,
            Conformance::NonConforming => false,
            Conformance::Fallback => nominal(),
        }
    }
}

impl From<bool> for Conformance {
    fn from(value: bool) -> Self {
        if value {
            Conformance::Conforming
        } else {
            Conformance::NonConforming
        }
    }
}

impl From<Option<bool>> for Conformance {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Conformance::Fallback, Conformance::from)
    }
}

pub type InstanceHook = Arc<dyn Fn(&Instance) -> Conformance + Send + Sync>;
pub type SubtypeHook = Arc<dyn Fn(&Class) -> Conformance + Send + Sync>;

/// Implemented by types that want to act as the capabilities of a family.
pub trait Conformable: Send + Sync {
    fn conformable_is_instance(&self, instance: &Instance) -> Conformance;
    fn conformable_is_subtype(&self, candidate: &Class) -> Conformance;
}

/// The pair of hooks a family supplies. Either may be missing while the
/// value is being assembled; declaring a family checks that both are there.
#[derive(Clone, Default)]
pub struct Capabilities {
    is_instance: Option<InstanceHook>,
    is_subtype: Option<SubtypeHook>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }
    /// Capabilities that always defer to nominal behavior.
    pub fn nominal() -> Self {
        Self::new()
            .on_is_instance(|_| Conformance::Fallback)
            .on_is_subtype(|_| Conformance::Fallback)
    }
    pub fn on_is_instance<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Instance) -> Conformance + Send + Sync + 'static,
    {
        self.is_instance = Some(Arc::new(hook));
        self
    }
    pub fn on_is_subtype<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Class) -> Conformance + Send + Sync + 'static,
    {
        self.is_subtype = Some(Arc::new(hook));
        self
    }
    pub fn is_instance_hook(&self) -> Option<InstanceHook> {
        self.is_instance.clone()
    }
    pub fn is_subtype_hook(&self) -> Option<SubtypeHook> {
        self.is_subtype.clone()
    }
    /// Name of the first hook that has not been supplied.
    pub fn missing_hook(&self) -> Option<&'static str> {
        if self.is_instance.is_none() {
            Some(IS_INSTANCE_HOOK)
        } else if self.is_subtype.is_none() {
            Some(IS_SUBTYPE_HOOK)
        } else {
            None
        }
    }
}

impl<T: Conformable + 'static> From<Arc<T>> for Capabilities {
    fn from(conformable: Arc<T>) -> Self {
        let for_subtype = Arc::clone(&conformable);
        Self::new()
            .on_is_instance(move |instance| conformable.conformable_is_instance(instance))
            .on_is_subtype(move |candidate| for_subtype.conformable_is_subtype(candidate))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field(IS_INSTANCE_HOOK, &self.is_instance.is_some())
            .field(IS_SUBTYPE_HOOK, &self.is_subtype.is_some())
            .finish()
    }
}
