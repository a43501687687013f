use std::sync::{Arc, Mutex};

use tracing::{debug, info, trace};

use crate::capability::{Capabilities, Conformance};
use crate::construct::{
    Class, ClassDecl, ClassId, ClassKeeper, Family, FamilyId, FamilyKeeper, IdGenerator, Instance,
};
use crate::error::{ConformableError, Result};
use crate::redirect::RedirectKeeper;

// ------------- Registry -------------
// This sets up the type system with the necessary structures. Composite
// operations lock in the order families, redirects, classes, generator.
#[derive(Debug)]
pub struct Registry {
    // owns a generator shared by families and classes
    id_generator: Arc<Mutex<IdGenerator>>,
    // owns keepers for the available constructs
    family_keeper: Arc<Mutex<FamilyKeeper>>,
    class_keeper: Arc<Mutex<ClassKeeper>>,
    redirect_keeper: Arc<Mutex<RedirectKeeper>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            id_generator: Arc::new(Mutex::new(IdGenerator::new())),
            family_keeper: Arc::new(Mutex::new(FamilyKeeper::new())),
            class_keeper: Arc::new(Mutex::new(ClassKeeper::new())),
            redirect_keeper: Arc::new(Mutex::new(RedirectKeeper::new())),
        }
    }
    // sizes of the keepers
    pub fn family_count(&self) -> Result<usize> {
        Ok(self.family_keeper.lock()?.len())
    }
    pub fn class_count(&self) -> Result<usize> {
        Ok(self.class_keeper.lock()?.len())
    }
    pub fn redirect_count(&self) -> Result<usize> {
        Ok(self.redirect_keeper.lock()?.len())
    }

    // ------------- Families -------------
    /// Declares a metaclass family. Both capability hooks must be present,
    /// also for families deriving from another one.
    pub fn declare_family(
        &self,
        name: impl Into<String>,
        parent: Option<FamilyId>,
        capabilities: Capabilities,
    ) -> Result<Arc<Family>> {
        let name = name.into();
        if let Some(hook) = capabilities.missing_hook() {
            return Err(ConformableError::MissingCapability { family: name, hook });
        }
        let mut families = self.family_keeper.lock()?;
        if families.lookup(&name).is_some() {
            return Err(ConformableError::DuplicateFamily(name));
        }
        let parent = parent.map(|p| families.get(p)).transpose()?;
        let family = FamilyId(self.id_generator.lock()?.generate());
        let kept = families.keep(Family::new(family, name, parent.as_deref(), capabilities))?;
        info!(family = %kept.name(), id = kept.family().get(), parent = ?kept.parent(), "family declared");
        Ok(kept)
    }
    pub fn family(&self, family: FamilyId) -> Result<Arc<Family>> {
        self.family_keeper.lock()?.get(family)
    }
    pub fn family_by_name(&self, name: &str) -> Result<Option<Arc<Family>>> {
        let families = self.family_keeper.lock()?;
        families.lookup(name).map(|f| families.get(f)).transpose()
    }

    // ------------- Classes -------------
    /// The single class construction path. Redirection rules are applied to
    /// the declared bases before the class is built, and a baseless class
    /// under a family becomes that family's top type.
    pub fn declare_class(&self, decl: ClassDecl) -> Result<Arc<Class>> {
        let mut families = self.family_keeper.lock()?;
        let redirects = self.redirect_keeper.lock()?;
        let mut classes = self.class_keeper.lock()?;

        let declared = decl
            .bases
            .iter()
            .map(|b| classes.get(*b))
            .collect::<Result<Vec<_>>>()?;
        if let Some(family) = decl.family {
            families.get(family)?;
        }
        let governing = most_derived(
            &families,
            &decl.name,
            decl.family.into_iter().chain(declared.iter().filter_map(|b| b.family())),
        )?;
        let lineage = match governing {
            Some(family) => families.get(family)?.lineage().to_vec(),
            None => Vec::new(),
        };

        let rewritten = redirects.rewrite_bases(&lineage, &decl.bases);
        if rewritten != decl.bases {
            debug!(class = %decl.name, declared = ?decl.bases, actual = ?rewritten, "bases redirected");
        }
        let bases = rewritten
            .iter()
            .map(|b| classes.get(*b))
            .collect::<Result<Vec<_>>>()?;
        if let Some(sealed) = bases.iter().find(|b| classes.is_sealed(b.class())) {
            return Err(ConformableError::SealedClass {
                class: sealed.name().to_owned(),
            });
        }
        // the governing family only picked the rules, the actual bases decide
        let family = most_derived(
            &families,
            &decl.name,
            decl.family.into_iter().chain(bases.iter().filter_map(|b| b.family())),
        )?;

        let top_of = family.filter(|_| bases.is_empty());
        if let Some(family) = top_of {
            if let Some(existing) = families.top(family) {
                return Err(duplicate_top(&families, &classes, family, existing)?);
            }
        }

        let class = ClassId(self.id_generator.lock()?.generate());
        if let Some(family) = top_of {
            if let Err(existing) = families.claim_top(family, class) {
                return Err(duplicate_top(&families, &classes, family, existing)?);
            }
            debug!(class = %decl.name, family = family.get(), "top type registered");
        }
        let kept = classes.keep(Class::new(class, decl.name, family, bases, decl.attributes));
        info!(class = %kept.name(), id = class.get(), family = ?family, bases = ?kept.bases(), "class declared");
        Ok(kept)
    }
    pub fn class(&self, class: ClassId) -> Result<Arc<Class>> {
        self.class_keeper.lock()?.get(class)
    }
    /// Marks a class as non-subclassable.
    pub fn seal(&self, class: ClassId) -> Result<()> {
        self.class_keeper.lock()?.seal(class)?;
        info!(class = class.get(), "class sealed");
        Ok(())
    }
    pub fn is_sealed(&self, class: ClassId) -> Result<bool> {
        Ok(self.class_keeper.lock()?.is_sealed(class))
    }

    // ------------- Conformable type system -------------
    /// Constructs the top type of an existing family.
    pub fn register_top(&self, family: FamilyId, name: impl Into<String>) -> Result<Arc<Class>> {
        self.declare_class(ClassDecl::new(name).family(family))
    }
    pub fn register_family_and_top(
        &self,
        name: impl Into<String>,
        capabilities: Capabilities,
        top: impl Into<String>,
    ) -> Result<(Arc<Family>, Arc<Class>)> {
        let family = self.declare_family(name, None, capabilities)?;
        let top = self.register_top(family.family(), top)?;
        Ok((family, top))
    }
    pub fn top_of(&self, family: FamilyId) -> Result<Option<Arc<Class>>> {
        let top = {
            let families = self.family_keeper.lock()?;
            families.get(family)?;
            families.top(family)
        };
        top.map(|t| self.class(t)).transpose()
    }
    pub fn is_top(&self, class: ClassId) -> Result<bool> {
        let family = self.class(class)?.family();
        let families = self.family_keeper.lock()?;
        Ok(family.is_some_and(|f| families.top(f) == Some(class)))
    }
    /// Capabilities of the family whose top type is `class`, if it is one.
    fn capabilities_of_top(&self, class: &Class) -> Result<Option<Capabilities>> {
        let Some(family) = class.family() else {
            return Ok(None);
        };
        let families = self.family_keeper.lock()?;
        if families.top(family) != Some(class.class()) {
            return Ok(None);
        }
        Ok(Some(families.get(family)?.capabilities().clone()))
    }
    pub fn nominal_is_instance(&self, instance: &Instance, ty: ClassId) -> Result<bool> {
        self.nominal_is_subtype(instance.class(), ty)
    }
    pub fn nominal_is_subtype(&self, candidate: ClassId, ty: ClassId) -> Result<bool> {
        let classes = self.class_keeper.lock()?;
        classes.get(ty)?;
        Ok(classes.get(candidate)?.derives_from(ty))
    }
    /// Membership test against `ty`. Only the top type of a family consults
    /// its hook; every other class answers nominally.
    pub fn is_instance(&self, instance: &Instance, ty: ClassId) -> Result<bool> {
        let target = self.class(ty)?;
        let verdict = match self.capabilities_of_top(&target)?.and_then(|c| c.is_instance_hook()) {
            // hooks run without any registry lock held
            Some(hook) => hook(instance),
            None => Conformance::Fallback,
        };
        trace!(class = %target.name(), ?verdict, "instance check");
        // the instance's own class is only looked up when the hook falls back
        match verdict {
            Conformance::Conforming => Ok(true),
            Conformance::NonConforming => Ok(false),
            Conformance::Fallback => self.nominal_is_instance(instance, ty),
        }
    }
    pub fn is_subtype(&self, candidate: ClassId, ty: ClassId) -> Result<bool> {
        let target = self.class(ty)?;
        let candidate = self.class(candidate)?;
        let verdict = match self.capabilities_of_top(&target)?.and_then(|c| c.is_subtype_hook()) {
            Some(hook) => hook(candidate.as_ref()),
            None => Conformance::Fallback,
        };
        trace!(class = %target.name(), candidate = %candidate.name(), ?verdict, "subtype check");
        Ok(verdict.resolve(|| candidate.derives_from(ty)))
    }

    // ------------- Subclass redirection -------------
    /// Redirects further subclassing of `from` under `family` onto `to`.
    /// `family` must govern `from`, i.e. be its family or an ancestor of it.
    pub fn install_redirect(&self, family: FamilyId, from: ClassId, to: ClassId) -> Result<()> {
        let families = self.family_keeper.lock()?;
        let mut redirects = self.redirect_keeper.lock()?;
        let classes = self.class_keeper.lock()?;

        let target_family = families.get(family)?;
        let from_class = classes.get(from)?;
        let to_class = classes.get(to)?;
        let governed = match from_class.family() {
            Some(f) => families.get(f)?.descends_from(family),
            None => false,
        };
        if !governed {
            return Err(ConformableError::InvalidRedirectTarget {
                family: target_family.name().to_owned(),
                class: from_class.name().to_owned(),
            });
        }
        let previous = redirects.install(family, from, to);
        if from == to {
            info!(family = %target_family.name(), from = %from_class.name(), ?previous, "redirect removed");
        } else {
            info!(family = %target_family.name(), from = %from_class.name(), to = %to_class.name(), ?previous, "redirect installed");
        }
        Ok(())
    }
    pub fn redirect_target(&self, family: FamilyId, from: ClassId) -> Result<Option<ClassId>> {
        Ok(self.redirect_keeper.lock()?.target(family, from))
    }
}

fn duplicate_top(
    families: &FamilyKeeper,
    classes: &ClassKeeper,
    family: FamilyId,
    existing: ClassId,
) -> Result<ConformableError> {
    Ok(ConformableError::DuplicateTopType {
        family: families.get(family)?.name().to_owned(),
        existing: classes.get(existing)?.name().to_owned(),
    })
}

// Picks the most derived family among the candidates; families that are not
// on one line of descent cannot be combined.
fn most_derived(
    families: &FamilyKeeper,
    class: &str,
    candidates: impl IntoIterator<Item = FamilyId>,
) -> Result<Option<FamilyId>> {
    let mut winner: Option<Arc<Family>> = None;
    for candidate in candidates {
        let candidate = families.get(candidate)?;
        winner = match winner {
            None => Some(candidate),
            Some(current) if candidate.descends_from(current.family()) => Some(candidate),
            Some(current) if current.descends_from(candidate.family()) => Some(current),
            Some(current) => {
                return Err(ConformableError::MetaclassConflict {
                    class: class.to_owned(),
                    message: format!("'{}' and '{}' are unrelated families", current.name(), candidate.name()),
                });
            }
        };
    }
    Ok(winner.map(|w| w.family()))
}
