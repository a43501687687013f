use std::sync::Arc;

use conformable::capability::{Capabilities, Conformable, Conformance};
use conformable::construct::{Class, ClassDecl, Instance};
use conformable::error::ConformableError;
use conformable::registry::Registry;

// Conforming for anything marked `is_shape_like`, nominal otherwise.
fn shape_capabilities() -> Capabilities {
    Capabilities::new()
        .on_is_instance(|i| {
            if i.has_attribute("is_shape_like") {
                Conformance::Conforming
            } else {
                Conformance::Fallback
            }
        })
        .on_is_subtype(|c| {
            if c.has_attribute("shape_like") {
                Conformance::Conforming
            } else {
                Conformance::Fallback
            }
        })
}

struct Shapes {
    registry: Registry,
    shape: Arc<Class>,
    circle: Arc<Class>,
    point: Arc<Class>,
}

fn setup() -> Shapes {
    let registry = Registry::new();
    let (_family, shape) = registry
        .register_family_and_top("ShapeMeta", shape_capabilities(), "Shape")
        .expect("family and top");
    let circle = registry
        .declare_class(ClassDecl::new("Circle").base(shape.class()))
        .expect("circle");
    let point = registry.declare_class(ClassDecl::new("Point")).expect("point");
    Shapes {
        registry,
        shape,
        circle,
        point,
    }
}

#[test]
fn plain_object_without_marker_is_nominally_not_a_shape() {
    let s = setup();
    let obj = Instance::new(s.point.class());
    assert!(!s.registry.is_instance(&obj, s.shape.class()).unwrap());
    assert_eq!(
        s.registry.is_instance(&obj, s.shape.class()).unwrap(),
        s.registry.nominal_is_instance(&obj, s.shape.class()).unwrap()
    );
}

#[test]
fn marked_foreign_object_conforms_to_top_type() {
    let s = setup();
    let obj = Instance::new(s.point.class()).with_attribute("is_shape_like", true);
    assert!(s.registry.is_instance(&obj, s.shape.class()).unwrap());
    assert!(!s.registry.nominal_is_instance(&obj, s.shape.class()).unwrap());
}

#[test]
fn derived_types_are_never_overridden() {
    let s = setup();
    // a circle without the marker is still a circle, purely nominally
    let circle = Instance::new(s.circle.class());
    assert!(s.registry.is_instance(&circle, s.circle.class()).unwrap());
    assert!(s.registry.is_instance(&circle, s.shape.class()).unwrap());
    // the hook would say yes for this one, but Circle does not consult it
    let marked_point = Instance::new(s.point.class()).with_attribute("is_shape_like", true);
    assert!(!s.registry.is_instance(&marked_point, s.circle.class()).unwrap());
    assert!(!s.registry.is_top(s.circle.class()).unwrap());
    assert!(s.registry.is_top(s.shape.class()).unwrap());
}

#[test]
fn hook_verdict_is_final_unless_it_falls_back() {
    let registry = Registry::new();
    let capabilities = Capabilities::new()
        .on_is_instance(|i| match i.attribute("verdict").and_then(|v| v.as_str()) {
            Some("yes") => Conformance::Conforming,
            Some("no") => Conformance::NonConforming,
            _ => Conformance::Fallback,
        })
        .on_is_subtype(|_| Conformance::Fallback);
    let (_family, top) = registry
        .register_family_and_top("VerdictMeta", capabilities, "Top")
        .unwrap();
    let child = registry.declare_class(ClassDecl::new("Child").base(top.class())).unwrap();
    let other = registry.declare_class(ClassDecl::new("Other")).unwrap();

    // nominal member told "no" is rejected
    let denied = Instance::new(child.class()).with_attribute("verdict", "no");
    assert!(!registry.is_instance(&denied, top.class()).unwrap());
    // non-member told "yes" is accepted
    let granted = Instance::new(other.class()).with_attribute("verdict", "yes");
    assert!(registry.is_instance(&granted, top.class()).unwrap());
    // fallback uses the nominal answer both ways
    assert!(registry.is_instance(&Instance::new(child.class()), top.class()).unwrap());
    assert!(!registry.is_instance(&Instance::new(other.class()), top.class()).unwrap());
}

#[test]
fn subtype_hook_applies_to_top_type_only() {
    let s = setup();
    let foreign = s
        .registry
        .declare_class(ClassDecl::new("Polygon").attribute("shape_like"))
        .unwrap();
    assert!(s.registry.is_subtype(foreign.class(), s.shape.class()).unwrap());
    assert!(!s.registry.is_subtype(foreign.class(), s.circle.class()).unwrap());
    assert!(s.registry.is_subtype(s.circle.class(), s.shape.class()).unwrap());
    assert!(!s.registry.is_subtype(s.point.class(), s.shape.class()).unwrap());
}

#[test]
fn second_baseless_class_is_a_duplicate_top_type() {
    let s = setup();
    let family = s.shape.family().expect("shape has a family");
    let err = s.registry.register_top(family, "Other").unwrap_err();
    match err {
        ConformableError::DuplicateTopType { family, existing } => {
            assert_eq!(family, "ShapeMeta");
            assert_eq!(existing, "Shape");
        }
        other => panic!("unexpected error: {other}"),
    }
    let top = s.registry.top_of(family).unwrap().expect("top still registered");
    assert_eq!(top.class(), s.shape.class());
}

#[test]
fn family_without_both_hooks_is_rejected() {
    let registry = Registry::new();
    let only_instance = Capabilities::new().on_is_instance(|_| Conformance::Fallback);
    let err = registry.declare_family("HalfMeta", None, only_instance).unwrap_err();
    assert!(matches!(
        err,
        ConformableError::MissingCapability { hook: "conformable_is_subtype", .. }
    ));
    let err = registry.declare_family("EmptyMeta", None, Capabilities::new()).unwrap_err();
    assert!(matches!(
        err,
        ConformableError::MissingCapability { hook: "conformable_is_instance", .. }
    ));
    // nothing was declared
    assert!(registry.family_by_name("HalfMeta").unwrap().is_none());
    assert_eq!(registry.family_count().unwrap(), 0);
}

#[test]
fn derived_families_supply_their_own_hooks_and_top() {
    let s = setup();
    let parent = s.shape.family().unwrap();
    let err = s
        .registry
        .declare_family("SolidMeta", Some(parent), Capabilities::new())
        .unwrap_err();
    assert!(matches!(err, ConformableError::MissingCapability { .. }));

    let solid = s
        .registry
        .declare_family("SolidMeta", Some(parent), Capabilities::nominal())
        .unwrap();
    assert!(solid.descends_from(parent));
    let solid_top = s.registry.register_top(solid.family(), "Solid").unwrap();
    assert_eq!(solid_top.family(), Some(solid.family()));
    assert_eq!(s.registry.top_of(parent).unwrap().unwrap().class(), s.shape.class());
}

#[test]
fn unrelated_families_conflict() {
    let s = setup();
    let (_other, colour) = s
        .registry
        .register_family_and_top("ColourMeta", Capabilities::nominal(), "Colour")
        .unwrap();
    let err = s
        .registry
        .declare_class(
            ClassDecl::new("Painted")
                .base(s.shape.class())
                .base(colour.class()),
        )
        .unwrap_err();
    assert!(matches!(err, ConformableError::MetaclassConflict { .. }));
}

#[test]
fn duplicate_family_names_are_rejected() {
    let s = setup();
    let err = s
        .registry
        .declare_family("ShapeMeta", None, Capabilities::nominal())
        .unwrap_err();
    assert!(matches!(err, ConformableError::DuplicateFamily(name) if name == "ShapeMeta"));
}

struct Registered;

impl Conformable for Registered {
    fn conformable_is_instance(&self, instance: &Instance) -> Conformance {
        instance.attribute("registered").and_then(|v| v.as_bool()).into()
    }
    fn conformable_is_subtype(&self, _candidate: &Class) -> Conformance {
        Conformance::NonConforming
    }
}

#[test]
fn trait_objects_supply_both_hooks() {
    let registry = Registry::new();
    let (_family, top) = registry
        .register_family_and_top("RegisteredMeta", Arc::new(Registered).into(), "Top")
        .unwrap();
    let child = registry.declare_class(ClassDecl::new("Child").base(top.class())).unwrap();
    let plain = registry.declare_class(ClassDecl::new("Plain")).unwrap();

    let yes = Instance::new(plain.class()).with_attribute("registered", true);
    let no = Instance::new(child.class()).with_attribute("registered", false);
    assert!(registry.is_instance(&yes, top.class()).unwrap());
    assert!(!registry.is_instance(&no, top.class()).unwrap());
    assert!(registry.is_instance(&Instance::new(child.class()), top.class()).unwrap());
    // the subtype hook denies even nominal subclasses of the top type
    assert!(!registry.is_subtype(child.class(), top.class()).unwrap());
}

#[test]
fn hooks_may_query_the_registry() {
    let registry = Arc::new(Registry::new());
    let (_helpers, marker) = registry
        .register_family_and_top("MarkerMeta", Capabilities::nominal(), "Marker")
        .unwrap();
    let weak = Arc::downgrade(&registry);
    let marker_id = marker.class();
    let capabilities = Capabilities::new()
        .on_is_instance(move |i| match weak.upgrade() {
            Some(registry) => registry.nominal_is_instance(i, marker_id).ok().into(),
            None => Conformance::Fallback,
        })
        .on_is_subtype(|_| Conformance::Fallback);
    let (_family, top) = registry
        .register_family_and_top("DelegatingMeta", capabilities, "Delegating")
        .unwrap();
    let marked = registry
        .declare_class(ClassDecl::new("Marked").base(marker.class()))
        .unwrap();
    assert!(registry.is_instance(&Instance::new(marked.class()), top.class()).unwrap());
}

#[test]
fn classes_of_another_registry_are_unknown() {
    let s = setup();
    let other = Registry::new();
    let stray = (0..8)
        .map(|n| other.declare_class(ClassDecl::new(format!("Stray{n}"))).unwrap())
        .last()
        .unwrap();
    assert!(matches!(
        s.registry.class(stray.class()),
        Err(ConformableError::UnknownClass(_))
    ));
    let err = s
        .registry
        .declare_class(ClassDecl::new("Orphan").base(stray.class()))
        .unwrap_err();
    assert!(matches!(err, ConformableError::UnknownClass(id) if id == stray.class()));
}

#[test]
fn final_hook_verdict_needs_no_known_class() {
    let s = setup();
    let other = Registry::new();
    let stray = (0..8)
        .map(|n| other.declare_class(ClassDecl::new(format!("Stray{n}"))).unwrap())
        .last()
        .unwrap();
    let marked = Instance::new(stray.class()).with_attribute("is_shape_like", true);
    assert!(s.registry.is_instance(&marked, s.shape.class()).unwrap());
    // falling back to the nominal answer does need the class
    let unmarked = Instance::new(stray.class());
    assert!(matches!(
        s.registry.is_instance(&unmarked, s.shape.class()),
        Err(ConformableError::UnknownClass(id)) if id == stray.class()
    ));
}
