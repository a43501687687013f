//! Conformable – a nominal type registry where one class per family may
//! decide its own membership tests, and where subclassing of a placeholder
//! class can be redirected onto a concrete one.
//!
//! The registry models what a host framework's type system provides:
//! * A [`construct::Family`] is a metaclass: it governs the classes built
//!   under it and carries the [`capability::Capabilities`] of that family.
//! * A [`construct::Class`] has an actual base list and a precomputed
//!   ancestor set; nominal subtyping is ancestor membership.
//! * An [`construct::Instance`] is a value of some class with a set of
//!   attributes that capability hooks may inspect.
//!
//! ## Conformable top types
//! The first class declared without bases under a family becomes that
//! family's top type. Membership tests against the top type go through the
//! family's hooks, which answer conforming, non-conforming, or fall back to
//! the nominal answer. Every class derived from the top type is tested
//! nominally.
//!
//! ## Subclass redirection
//! [`registry::Registry::install_redirect`] makes every later declaration
//! that lists `from` as a base get `to` instead. Classes declared earlier
//! keep their bases.
//!
//! ## Quick Start
//! ```
//! use conformable::{capability::{Capabilities, Conformance}, construct::{ClassDecl, Instance}, registry::Registry};
//! let registry = Registry::new();
//! let capabilities = Capabilities::new()
//!     .on_is_instance(|i| if i.has_attribute("is_shape_like") { Conformance::Conforming } else { Conformance::Fallback })
//!     .on_is_subtype(|_| Conformance::Fallback);
//! let (_family, shape) = registry.register_family_and_top("ShapeMeta", capabilities, "Shape").unwrap();
//! let circle = registry.declare_class(ClassDecl::new("Circle").base(shape.class())).unwrap();
//! let point = registry.declare_class(ClassDecl::new("Point")).unwrap();
//! assert!(registry.is_instance(&Instance::new(point.class()).with_attribute("is_shape_like", true), shape.class()).unwrap());
//! assert!(registry.is_instance(&Instance::new(circle.class()), circle.class()).unwrap());
//! ```

pub mod capability;
pub mod construct;
pub mod error;
pub mod manifest;
pub mod redirect;
pub mod registry;
pub mod settings;
