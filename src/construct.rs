// keepers index families and classes by their numeric identities
use core::hash::BuildHasherDefault;
use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;
use std::sync::Arc;

// used to keep the one-to-one mapping between family names and their identities
use bimap::BiMap;

// ancestor sets, so that nominal subtype checks are a single lookup
use roaring::RoaringTreemap;

use seahash::SeaHasher;
use serde_json::Value;

// used to print out readable forms of a construct
use std::fmt;

use crate::capability::Capabilities;
use crate::error::{ConformableError, Result};

pub type IdHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: u64 = 0;

// ------------- Identities -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FamilyId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub(crate) u64);

impl FamilyId {
    pub fn get(self) -> u64 {
        self.0
    }
}
impl ClassId {
    pub fn get(self) -> u64 {
        self.0
    }
}
impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "family#{}", self.0)
    }
}
impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

// Identities are only handed out once a declaration has passed all of its
// checks, so nothing is ever released back.
#[derive(Debug)]
pub struct IdGenerator {
    lower_bound: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            lower_bound: GENESIS,
        }
    }
    pub fn generate(&mut self) -> u64 {
        self.lower_bound += 1;
        self.lower_bound
    }
    pub fn lower_bound(&self) -> u64 {
        self.lower_bound
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Family -------------
/// A metaclass family: owns the capabilities consulted for its top type.
#[derive(Debug)]
pub struct Family {
    family: FamilyId,
    name: String,
    parent: Option<FamilyId>,
    // this family followed by its parent, grandparent, ...
    lineage: Vec<FamilyId>,
    capabilities: Capabilities,
}

impl Family {
    pub(crate) fn new(
        family: FamilyId,
        name: String,
        parent: Option<&Family>,
        capabilities: Capabilities,
    ) -> Self {
        let mut lineage = vec![family];
        if let Some(parent) = parent {
            lineage.extend_from_slice(&parent.lineage);
        }
        Self {
            family,
            name,
            parent: parent.map(|p| p.family),
            lineage,
            capabilities,
        }
    }
    pub fn family(&self) -> FamilyId {
        self.family
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn parent(&self) -> Option<FamilyId> {
        self.parent
    }
    pub fn lineage(&self) -> &[FamilyId] {
        &self.lineage
    }
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
    /// True when `ancestor` is this family or one of the families it derives from.
    pub fn descends_from(&self, ancestor: FamilyId) -> bool {
        self.lineage.contains(&ancestor)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug)]
pub struct FamilyKeeper {
    kept: HashMap<FamilyId, Arc<Family>, IdHasher>,
    names: BiMap<String, FamilyId>,
    // the top type of each family, filled by the first baseless class
    tops: HashMap<FamilyId, ClassId, IdHasher>,
}

impl FamilyKeeper {
    pub fn new() -> Self {
        Self {
            kept: HashMap::default(),
            names: BiMap::new(),
            tops: HashMap::default(),
        }
    }
    pub(crate) fn keep(&mut self, family: Family) -> Result<Arc<Family>> {
        if self.kept.contains_key(&family.family()) {
            return Err(ConformableError::FamilyInUse(family.family()));
        }
        if self.names.contains_left(family.name()) {
            return Err(ConformableError::DuplicateFamily(family.name().to_owned()));
        }
        let kept = Arc::new(family);
        self.names.insert(kept.name().to_owned(), kept.family());
        self.kept.insert(kept.family(), Arc::clone(&kept));
        Ok(kept)
    }
    pub fn get(&self, family: FamilyId) -> Result<Arc<Family>> {
        self.kept
            .get(&family)
            .cloned()
            .ok_or(ConformableError::UnknownFamily(family))
    }
    pub fn lookup(&self, name: &str) -> Option<FamilyId> {
        self.names.get_by_left(name).copied()
    }
    pub fn top(&self, family: FamilyId) -> Option<ClassId> {
        self.tops.get(&family).copied()
    }
    /// Claims the top slot of a family. Returns the current holder when the
    /// slot was already taken.
    pub(crate) fn claim_top(&mut self, family: FamilyId, class: ClassId) -> std::result::Result<(), ClassId> {
        match self.tops.entry(family) {
            Entry::Vacant(e) => {
                e.insert(class);
                Ok(())
            }
            Entry::Occupied(e) => Err(*e.get()),
        }
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

impl Default for FamilyKeeper {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Class -------------
/// A class as built by the registry: its bases are the actual ones, after
/// any redirection was applied.
#[derive(Debug)]
pub struct Class {
    class: ClassId,
    name: String,
    family: Option<FamilyId>,
    bases: Vec<ClassId>,
    attributes: Vec<String>,
    ancestors: RoaringTreemap,
}

impl Class {
    pub(crate) fn new(
        class: ClassId,
        name: String,
        family: Option<FamilyId>,
        bases: Vec<Arc<Class>>,
        attributes: Vec<String>,
    ) -> Self {
        let mut ancestors = RoaringTreemap::new();
        ancestors.insert(class.0);
        for base in bases.iter() {
            ancestors |= &base.ancestors;
        }
        Self {
            class,
            name,
            family,
            bases: bases.iter().map(|b| b.class).collect(),
            attributes,
            ancestors,
        }
    }
    pub fn class(&self) -> ClassId {
        self.class
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// `None` for classes built by the plain metaclass.
    pub fn family(&self) -> Option<FamilyId> {
        self.family
    }
    pub fn bases(&self) -> &[ClassId] {
        &self.bases
    }
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
    pub fn ancestors(&self) -> &RoaringTreemap {
        &self.ancestors
    }
    /// Nominal subtyping: `other` is this class or one of its ancestors.
    pub fn derives_from(&self, other: ClassId) -> bool {
        self.ancestors.contains(other.0)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
    }
}
impl Eq for Class {}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug)]
pub struct ClassKeeper {
    kept: HashMap<ClassId, Arc<Class>, IdHasher>,
    sealed: HashSet<ClassId, IdHasher>,
}

impl ClassKeeper {
    pub fn new() -> Self {
        Self {
            kept: HashMap::default(),
            sealed: HashSet::default(),
        }
    }
    pub(crate) fn keep(&mut self, class: Class) -> Arc<Class> {
        let kept = Arc::new(class);
        self.kept.insert(kept.class(), Arc::clone(&kept));
        kept
    }
    pub fn get(&self, class: ClassId) -> Result<Arc<Class>> {
        self.kept
            .get(&class)
            .cloned()
            .ok_or(ConformableError::UnknownClass(class))
    }
    pub(crate) fn seal(&mut self, class: ClassId) -> Result<()> {
        self.get(class)?;
        self.sealed.insert(class);
        Ok(())
    }
    pub fn is_sealed(&self, class: ClassId) -> bool {
        self.sealed.contains(&class)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

impl Default for ClassKeeper {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Declarations and instances -------------
/// What a caller asks the registry to build.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub family: Option<FamilyId>,
    pub bases: Vec<ClassId>,
    pub attributes: Vec<String>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family: None,
            bases: Vec::new(),
            attributes: Vec::new(),
        }
    }
    pub fn family(mut self, family: FamilyId) -> Self {
        self.family = Some(family);
        self
    }
    pub fn base(mut self, base: ClassId) -> Self {
        self.bases.push(base);
        self
    }
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }
}

/// A value whose membership is being tested.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    class: ClassId,
    attributes: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            attributes: HashMap::new(),
        }
    }
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
    pub fn class(&self) -> ClassId {
        self.class
    }
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}
