//! Redirection of subclassing from one class onto another.
//!
//! A rule `(family, from, to)` makes every class declared afterwards under
//! `family` (or a family deriving from it) that lists `from` among its bases
//! get `to` in that position instead. Rewriting is a single pass: the
//! substituted class is not looked up again.

use std::collections::HashMap;

use crate::construct::{ClassId, FamilyId, IdHasher};

#[derive(Debug, Default)]
pub struct RedirectKeeper {
    rules: HashMap<(FamilyId, ClassId), ClassId, IdHasher>,
}

impl RedirectKeeper {
    pub fn new() -> Self {
        Self::default()
    }
    /// Installs or overwrites the rule for `(family, from)`. Redirecting a
    /// class onto itself removes the rule. Returns the previous target.
    pub(crate) fn install(&mut self, family: FamilyId, from: ClassId, to: ClassId) -> Option<ClassId> {
        if from == to {
            self.rules.remove(&(family, from))
        } else {
            self.rules.insert((family, from), to)
        }
    }
    pub fn target(&self, family: FamilyId, from: ClassId) -> Option<ClassId> {
        self.rules.get(&(family, from)).copied()
    }
    /// The rule visible through `lineage` (nearest family first).
    pub fn resolve(&self, lineage: &[FamilyId], from: ClassId) -> Option<ClassId> {
        lineage.iter().find_map(|family| self.target(*family, from))
    }
    /// Returns `bases` with every redirected entry substituted, order kept.
    pub fn rewrite_bases(&self, lineage: &[FamilyId], bases: &[ClassId]) -> Vec<ClassId> {
        bases
            .iter()
            .map(|base| self.resolve(lineage, *base).unwrap_or(*base))
            .collect()
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
