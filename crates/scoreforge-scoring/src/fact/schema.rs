//! Domain schema: the closed set of fact classes a network can see.
//!
//! Classes are registered by name and tied to a concrete Rust type, or
//! declared abstract so that several concrete classes can share an entry
//! point. The supertype closure is resolved once, when a network is compiled,
//! into a map from concrete type to every class name it is assignable to.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use super::{DomainObject, FactRef, Value};
use crate::error::ConstraintConfigError;

/// Role of a concrete fact class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactKind {
    /// Planning entity: carries planning variables.
    Entity,
    /// Problem fact: fixed input data.
    ProblemFact,
}

impl FactKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            FactKind::Entity => "planning entity",
            FactKind::ProblemFact => "problem fact",
        }
    }
}

pub(crate) type FactPredicate = Arc<dyn Fn(&FactRef) -> bool + Send + Sync>;
pub(crate) type FactMapping = Arc<dyn Fn(&FactRef) -> Value + Send + Sync>;

struct ConcreteDef {
    type_id: TypeId,
    kind: FactKind,
    assigned: Option<FactPredicate>,
    planning_id: Option<FactMapping>,
}

struct ClassDef {
    name: String,
    parents: Vec<String>,
    concrete: Option<ConcreteDef>,
}

/// Registry of fact classes, consumed when a network is compiled.
///
/// Registration never fails on the spot; problems are kept and reported by
/// the compiler as a [`ConstraintConfigError`].
///
/// # Example
///
/// ```
/// use std::sync::RwLock;
/// use scoreforge_scoring::fact::DomainSchema;
///
/// #[derive(Debug)]
/// struct Lesson { id: i64, room: RwLock<Option<i64>> }
/// #[derive(Debug)]
/// struct Room { id: i64 }
///
/// let mut schema = DomainSchema::new();
/// schema
///     .entity::<Lesson>("Lesson")
///     .assigned_when(|l| l.room.read().unwrap().is_some())
///     .planning_id(|l| l.id);
/// schema.problem_fact::<Room>("Room").planning_id(|r| r.id);
/// assert_eq!(schema.len(), 2);
/// ```
#[derive(Default)]
pub struct DomainSchema {
    classes: Vec<ClassDef>,
    errors: Vec<ConstraintConfigError>,
}

impl DomainSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a planning entity class backed by `T`.
    pub fn entity<T: DomainObject>(&mut self, name: &str) -> ClassBuilder<'_, T> {
        self.register_concrete::<T>(name, FactKind::Entity)
    }

    /// Registers a problem fact class backed by `T`.
    pub fn problem_fact<T: DomainObject>(&mut self, name: &str) -> ClassBuilder<'_, T> {
        self.register_concrete::<T>(name, FactKind::ProblemFact)
    }

    /// Registers a class with no instances of its own, only subclasses.
    pub fn abstract_class(&mut self, name: &str) -> AbstractClassBuilder<'_> {
        let index = self.push_class(name, None);
        AbstractClassBuilder {
            schema: self,
            index,
        }
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn register_concrete<T: DomainObject>(&mut self, name: &str, kind: FactKind) -> ClassBuilder<'_, T> {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();
        let clash = self.classes.iter().find(|class| {
            class
                .concrete
                .as_ref()
                .is_some_and(|concrete| concrete.type_id == type_id)
        });
        let index = match clash {
            Some(existing) => {
                let error = ConstraintConfigError::DuplicateType {
                    type_name,
                    first: existing.name.clone(),
                    second: name.to_string(),
                };
                self.errors.push(error);
                None
            }
            None => self.push_class(
                name,
                Some(ConcreteDef {
                    type_id,
                    kind,
                    assigned: None,
                    planning_id: None,
                }),
            ),
        };
        ClassBuilder {
            schema: self,
            index,
            _type: PhantomData,
        }
    }

    fn push_class(&mut self, name: &str, concrete: Option<ConcreteDef>) -> Option<usize> {
        if self.classes.iter().any(|class| class.name == name) {
            self.errors
                .push(ConstraintConfigError::DuplicateClass(name.to_string()));
            return None;
        }
        self.classes.push(ClassDef {
            name: name.to_string(),
            parents: Vec::new(),
            concrete,
        });
        Some(self.classes.len() - 1)
    }

    fn add_parent(&mut self, index: Option<usize>, parent: &str) {
        if let Some(class) = index.and_then(|i| self.classes.get_mut(i)) {
            class.parents.push(parent.to_string());
        }
    }

    fn concrete_mut(&mut self, index: Option<usize>) -> Option<&mut ConcreteDef> {
        index
            .and_then(|i| self.classes.get_mut(i))
            .and_then(|class| class.concrete.as_mut())
    }

    /// Validates the registrations and computes the supertype closure.
    pub(crate) fn resolve(mut self) -> Result<ResolvedSchema, ConstraintConfigError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        let by_name: HashMap<&str, usize> = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, class)| (class.name.as_str(), i))
            .collect();
        for class in &self.classes {
            for parent in &class.parents {
                if !by_name.contains_key(parent.as_str()) {
                    return Err(ConstraintConfigError::UnknownSuperclass {
                        class: class.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let mut assignable: HashMap<String, Vec<TypeId>> = self
            .classes
            .iter()
            .map(|class| (class.name.clone(), Vec::new()))
            .collect();
        for (index, class) in self.classes.iter().enumerate() {
            let ancestors = self.ancestors(index, &by_name)?;
            if let Some(concrete) = &class.concrete {
                for ancestor in ancestors {
                    if let Some(types) = assignable.get_mut(&self.classes[ancestor].name) {
                        types.push(concrete.type_id);
                    }
                }
            }
        }

        let concrete = self
            .classes
            .into_iter()
            .filter_map(|class| {
                let name = class.name;
                class.concrete.map(|def| {
                    (
                        def.type_id,
                        ResolvedClass {
                            name,
                            kind: def.kind,
                            assigned: def.assigned,
                            planning_id: def.planning_id,
                        },
                    )
                })
            })
            .collect();
        Ok(ResolvedSchema {
            concrete,
            assignable,
        })
    }

    // The class itself plus every transitive parent; fails on a cycle.
    fn ancestors(
        &self,
        start: usize,
        by_name: &HashMap<&str, usize>,
    ) -> Result<Vec<usize>, ConstraintConfigError> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![(start, vec![start])];
        while let Some((index, path)) = stack.pop() {
            if !seen.insert(index) {
                continue;
            }
            order.push(index);
            for parent in &self.classes[index].parents {
                let Some(&parent_index) = by_name.get(parent.as_str()) else {
                    continue;
                };
                if path.contains(&parent_index) {
                    return Err(ConstraintConfigError::SupertypeCycle(
                        self.classes[parent_index].name.clone(),
                    ));
                }
                let mut next = path.clone();
                next.push(parent_index);
                stack.push((parent_index, next));
            }
        }
        Ok(order)
    }
}

/// Configures a concrete class right after registration.
pub struct ClassBuilder<'a, T> {
    schema: &'a mut DomainSchema,
    index: Option<usize>,
    _type: PhantomData<fn(&T)>,
}

impl<T: DomainObject> ClassBuilder<'_, T> {
    /// Declares a supertype; the class becomes visible to its entry points.
    pub fn extends(self, parent: &str) -> Self {
        self.schema.add_parent(self.index, parent);
        self
    }

    /// Predicate deciding whether an entity is assigned.
    ///
    /// Unassigned entities are skipped by `for_each` and `if_exists`, but
    /// still reach the `*_including_unassigned` variants.
    pub fn assigned_when<F>(self, assigned: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate: FactPredicate =
            Arc::new(move |fact: &FactRef| fact.downcast_ref::<T>().is_some_and(&assigned));
        if let Some(concrete) = self.schema.concrete_mut(self.index) {
            concrete.assigned = Some(predicate);
        }
        self
    }

    /// Unique, comparable identifier used by `for_each_unique_pair`.
    pub fn planning_id<F, V>(self, id: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        let mapping: FactMapping = Arc::new(move |fact: &FactRef| {
            fact.downcast_ref::<T>()
                .map_or(Value::Null, |object| id(object).into())
        });
        if let Some(concrete) = self.schema.concrete_mut(self.index) {
            concrete.planning_id = Some(mapping);
        }
        self
    }
}

/// Configures an abstract class right after registration.
pub struct AbstractClassBuilder<'a> {
    schema: &'a mut DomainSchema,
    index: Option<usize>,
}

impl AbstractClassBuilder<'_> {
    pub fn extends(self, parent: &str) -> Self {
        self.schema.add_parent(self.index, parent);
        self
    }
}

pub(crate) struct ResolvedClass {
    pub(crate) name: String,
    pub(crate) kind: FactKind,
    pub(crate) assigned: Option<FactPredicate>,
    pub(crate) planning_id: Option<FactMapping>,
}

pub(crate) struct ResolvedSchema {
    concrete: HashMap<TypeId, ResolvedClass>,
    assignable: HashMap<String, Vec<TypeId>>,
}

impl ResolvedSchema {
    pub(crate) fn class_of(&self, type_id: TypeId) -> Option<&ResolvedClass> {
        self.concrete.get(&type_id)
    }

    /// Concrete types whose instances are visible through `class`.
    pub(crate) fn assignable_types(&self, class: &str) -> Result<&[TypeId], ConstraintConfigError> {
        self.assignable
            .get(class)
            .map(Vec::as_slice)
            .ok_or_else(|| ConstraintConfigError::UnknownClass(class.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Visit;
    #[derive(Debug)]
    struct Customer;
    #[derive(Debug)]
    struct Depot;

    fn resolve(schema: DomainSchema) -> ResolvedSchema {
        match schema.resolve() {
            Ok(resolved) => resolved,
            Err(e) => panic!("schema should resolve: {e}"),
        }
    }

    #[test]
    fn test_supertype_closure() {
        let mut schema = DomainSchema::new();
        schema.abstract_class("Location");
        schema.abstract_class("Stop").extends("Location");
        schema.problem_fact::<Customer>("Customer").extends("Stop");
        schema.problem_fact::<Depot>("Depot").extends("Location");
        schema.entity::<Visit>("Visit");
        let resolved = resolve(schema);

        let location = resolved.assignable_types("Location").unwrap();
        assert_eq!(location.len(), 2);
        assert!(location.contains(&TypeId::of::<Customer>()));
        assert!(location.contains(&TypeId::of::<Depot>()));
        assert_eq!(
            resolved.assignable_types("Stop").unwrap(),
            &[TypeId::of::<Customer>()]
        );
        assert_eq!(
            resolved.class_of(TypeId::of::<Visit>()).map(|c| c.kind),
            Some(FactKind::Entity)
        );
    }

    #[test]
    fn test_unknown_class_lookup() {
        let resolved = resolve(DomainSchema::new());
        assert!(matches!(
            resolved.assignable_types("Nope"),
            Err(ConstraintConfigError::UnknownClass(name)) if name == "Nope"
        ));
    }

    #[test]
    fn test_duplicate_registrations_are_deferred() {
        let mut schema = DomainSchema::new();
        schema.entity::<Visit>("Visit");
        schema.problem_fact::<Visit>("AlsoVisit");
        assert!(matches!(
            schema.resolve(),
            Err(ConstraintConfigError::DuplicateType { .. })
        ));

        let mut schema = DomainSchema::new();
        schema.entity::<Visit>("Visit");
        schema.problem_fact::<Depot>("Visit");
        assert!(matches!(
            schema.resolve(),
            Err(ConstraintConfigError::DuplicateClass(name)) if name == "Visit"
        ));
    }

    #[test]
    fn test_supertype_cycle() {
        let mut schema = DomainSchema::new();
        schema.abstract_class("A").extends("B");
        schema.abstract_class("B").extends("A");
        assert!(matches!(
            schema.resolve(),
            Err(ConstraintConfigError::SupertypeCycle(_))
        ));
    }

    #[test]
    fn test_unknown_superclass() {
        let mut schema = DomainSchema::new();
        schema.entity::<Visit>("Visit").extends("Missing");
        assert!(matches!(
            schema.resolve(),
            Err(ConstraintConfigError::UnknownSuperclass { parent, .. }) if parent == "Missing"
        ));
    }
}
