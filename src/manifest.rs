//! Declarative manifests: an ordered list of statements run against a
//! [`Registry`].
//!
//! ```json
//! { "statements": [
//!     { "family": { "name": "ShapeMeta",
//!                   "instance": { "attribute": "is_shape_like" },
//!                   "subtype": "fallback" } },
//!     { "class": { "name": "Shape", "family": "ShapeMeta" } },
//!     { "class": { "name": "Circle", "bases": ["Shape"] } },
//!     { "is_instance": { "class": "Circle", "type": "Shape" } }
//! ] }
//! ```
//!
//! Statements run in order, so a `redirect` only affects the classes that
//! come after it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::capability::{Capabilities, Conformance};
use crate::construct::{ClassDecl, ClassId, FamilyId, Instance};
use crate::error::{ConformableError, Result};
use crate::registry::Registry;

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub statements: Vec<Statement>,
}

impl Manifest {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Family(FamilyStatement),
    Class(ClassStatement),
    Redirect(RedirectStatement),
    Seal(String),
    IsInstance(InstanceQuery),
    IsSubtype(SubtypeQuery),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyStatement {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub instance: Option<HookRule>,
    #[serde(default)]
    pub subtype: Option<HookRule>,
}

/// How a declared hook answers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookRule {
    /// Always defer to nominal behavior.
    Fallback,
    /// Conforming when the tested instance or class carries the attribute.
    Attribute(String),
    Always(bool),
}

impl HookRule {
    fn answer(&self, has_attribute: impl Fn(&str) -> bool) -> Conformance {
        match self {
            HookRule::Fallback => Conformance::Fallback,
            HookRule::Attribute(name) if has_attribute(name) => Conformance::Conforming,
            HookRule::Attribute(_) => Conformance::Fallback,
            HookRule::Always(answer) => Conformance::from(*answer),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassStatement {
    pub name: String,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedirectStatement {
    pub family: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceQuery {
    pub class: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtypeQuery {
    pub candidate: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Result of one query statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub query: String,
    pub result: bool,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", self.query, self.result)
    }
}

/// Runs manifests against a registry, resolving names to identities.
pub struct Runner<'r> {
    registry: &'r Registry,
    classes: HashMap<String, ClassId>,
}

impl<'r> Runner<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            classes: HashMap::new(),
        }
    }
    pub fn class_id(&self, name: &str) -> Result<ClassId> {
        self.classes
            .get(name)
            .copied()
            .ok_or_else(|| ConformableError::Manifest(format!("unknown class '{}'", name)))
    }
    pub fn family_id(&self, name: &str) -> Result<FamilyId> {
        self.registry
            .family_by_name(name)?
            .map(|f| f.family())
            .ok_or_else(|| ConformableError::Manifest(format!("unknown family '{}'", name)))
    }
    pub fn run(&mut self, manifest: &Manifest) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::new();
        for statement in manifest.statements.iter() {
            if let Some(outcome) = self.execute(statement)? {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }
    pub fn execute(&mut self, statement: &Statement) -> Result<Option<Outcome>> {
        debug!(?statement, "executing statement");
        match statement {
            Statement::Family(family) => {
                let parent = family.parent.as_deref().map(|p| self.family_id(p)).transpose()?;
                self.registry
                    .declare_family(&family.name, parent, capabilities(family))?;
                Ok(None)
            }
            Statement::Class(class) => {
                if self.classes.contains_key(&class.name) {
                    return Err(ConformableError::Manifest(format!(
                        "class '{}' is declared twice",
                        class.name
                    )));
                }
                let mut decl = ClassDecl::new(&class.name);
                if let Some(family) = &class.family {
                    decl = decl.family(self.family_id(family)?);
                }
                for base in class.bases.iter() {
                    decl = decl.base(self.class_id(base)?);
                }
                for attribute in class.attributes.iter() {
                    decl = decl.attribute(attribute);
                }
                let kept = self.registry.declare_class(decl)?;
                self.classes.insert(class.name.clone(), kept.class());
                Ok(None)
            }
            Statement::Redirect(redirect) => {
                self.registry.install_redirect(
                    self.family_id(&redirect.family)?,
                    self.class_id(&redirect.from)?,
                    self.class_id(&redirect.to)?,
                )?;
                Ok(None)
            }
            Statement::Seal(class) => {
                self.registry.seal(self.class_id(class)?)?;
                Ok(None)
            }
            Statement::IsInstance(query) => {
                let instance = query
                    .attributes
                    .iter()
                    .fold(Instance::new(self.class_id(&query.class)?), |i, (k, v)| {
                        i.with_attribute(k.as_str(), v.clone())
                    });
                let result = self.registry.is_instance(&instance, self.class_id(&query.ty)?)?;
                Ok(Some(Outcome {
                    query: format!("is_instance({}, {})", query.class, query.ty),
                    result,
                }))
            }
            Statement::IsSubtype(query) => {
                let result = self
                    .registry
                    .is_subtype(self.class_id(&query.candidate)?, self.class_id(&query.ty)?)?;
                Ok(Some(Outcome {
                    query: format!("is_subtype({}, {})", query.candidate, query.ty),
                    result,
                }))
            }
        }
    }
}

// Hooks left out of the statement stay missing, so the registry rejects
// the family.
fn capabilities(family: &FamilyStatement) -> Capabilities {
    let mut capabilities = Capabilities::new();
    if let Some(rule) = family.instance.clone() {
        capabilities = capabilities.on_is_instance(move |i| rule.answer(|a| i.has_attribute(a)));
    }
    if let Some(rule) = family.subtype.clone() {
        capabilities = capabilities.on_is_subtype(move |c| rule.answer(|a| c.has_attribute(a)));
    }
    capabilities
}
