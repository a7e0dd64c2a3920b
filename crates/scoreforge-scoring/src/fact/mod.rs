//! Facts, their values and their registration.
//!
//! A fact is any `Debug + Send + Sync + 'static` object owned by the caller's
//! solution. The engine holds it through a [`FactRef`] and never mutates or
//! clones the object itself; planning variables change through interior
//! mutability between the paired `before_*`/`after_*` notifications.

mod registry;
mod schema;
mod value;

pub use registry::{FactRegistry, MutationPhase};
pub use schema::{AbstractClassBuilder, ClassBuilder, DomainSchema, FactKind};
pub use value::Value;

pub(crate) use schema::{FactPredicate, ResolvedSchema};

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Object-safe view over any fact type.
pub trait DomainObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> DomainObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Identity of a fact: the address of its shared allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactId(usize);

/// Shared handle to a caller-owned fact.
///
/// Equality, hashing and ordering follow the identity of the underlying
/// `Arc`, never the fact's contents.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use scoreforge_scoring::fact::FactRef;
///
/// #[derive(Debug)]
/// struct Room { name: &'static str }
///
/// let room = Arc::new(Room { name: "A" });
/// let a = FactRef::new(room.clone());
/// let b = FactRef::new(room);
/// assert_eq!(a, b);
/// assert_eq!(a.downcast_ref::<Room>().map(|r| r.name), Some("A"));
/// assert_ne!(a, FactRef::new(Arc::new(Room { name: "A" })));
/// ```
#[derive(Clone)]
pub struct FactRef {
    inner: Arc<dyn DomainObject>,
    type_id: TypeId,
    type_name: &'static str,
}

impl FactRef {
    pub fn new<T: DomainObject>(fact: Arc<T>) -> Self {
        Self {
            inner: fact,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> FactId {
        FactId(Arc::as_ptr(&self.inner).cast::<()>() as usize)
    }

    /// Concrete type of the fact.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path.
    pub fn short_type_name(&self) -> &'static str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(self.type_name)
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        let object: &dyn DomainObject = &*self.inner;
        object.as_any().downcast_ref::<T>()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for FactRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for FactRef {}

impl Hash for FactRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl Ord for FactRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl PartialOrd for FactRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for FactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for FactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<T: DomainObject> From<Arc<T>> for FactRef {
    fn from(fact: Arc<T>) -> Self {
        Self::new(fact)
    }
}
