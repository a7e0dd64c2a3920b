//! Shared user functions and their sharing identity.

use std::any::TypeId;
use std::fmt;
use std::mem::size_of;
use std::sync::Arc;

use crate::fact::Value;
use crate::tuple::Row;

/// Identity of a user function, used to decide node sharing.
///
/// A closure that captures nothing (or a `fn` item) is zero-sized, so every
/// instance of it behaves identically and it is keyed by its type. Any other
/// closure is keyed by its allocation: clones of one stream share it, two
/// separately written closures never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    Type(TypeId),
    Instance(usize),
}

impl FunctionKey {
    fn of<F: 'static>(func: &Arc<F>) -> Self {
        if size_of::<F>() == 0 {
            FunctionKey::Type(TypeId::of::<F>())
        } else {
            FunctionKey::Instance(Arc::as_ptr(func) as usize)
        }
    }

    // Mapper wraps the user closure to convert its output; the wrapper is
    // zero-sized exactly when the user closure is, so key on the user type.
    fn of_wrapped<F: 'static, W>(wrapper: &Arc<W>) -> Self {
        if size_of::<F>() == 0 {
            FunctionKey::Type(TypeId::of::<F>())
        } else {
            FunctionKey::Instance(Arc::as_ptr(wrapper) as usize)
        }
    }
}

/// A shared user function plus its [`FunctionKey`].
pub struct Lambda<F: ?Sized> {
    func: Arc<F>,
    key: FunctionKey,
}

impl<F: ?Sized> Lambda<F> {
    pub fn key(&self) -> FunctionKey {
        self.key
    }
}

impl<F: ?Sized> Clone for Lambda<F> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            key: self.key,
        }
    }
}

impl<F: ?Sized> fmt::Debug for Lambda<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lambda").field(&self.key).finish()
    }
}

/// Tuple predicate.
pub type Predicate = Lambda<dyn for<'a> Fn(Row<'a>) -> bool + Send + Sync>;
/// Tuple to single value.
pub type Mapper = Lambda<dyn for<'a> Fn(Row<'a>) -> Value + Send + Sync>;
/// Tuple to integer (match weights, sums).
pub type IntMapper = Lambda<dyn for<'a> Fn(Row<'a>) -> i64 + Send + Sync>;
/// Predicate over a left and a right tuple.
pub type BiPredicate = Lambda<dyn for<'a, 'b> Fn(Row<'a>, Row<'b>) -> bool + Send + Sync>;
/// Tuple to the values replacing its last element.
pub type Flattener = Lambda<dyn for<'a> Fn(Row<'a>) -> Vec<Value> + Send + Sync>;

impl Predicate {
    pub fn new<F>(func: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> bool + Send + Sync + 'static,
    {
        let func = Arc::new(func);
        let key = FunctionKey::of(&func);
        Lambda { func, key }
    }

    pub fn test(&self, row: Row<'_>) -> bool {
        (self.func)(row)
    }
}

impl Mapper {
    pub fn new<F, V>(func: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        let func = Arc::new(move |row: Row<'_>| -> Value { func(row).into() });
        let key = FunctionKey::of_wrapped::<F, _>(&func);
        Lambda { func, key }
    }

    pub fn apply(&self, row: Row<'_>) -> Value {
        (self.func)(row)
    }
}

impl IntMapper {
    pub fn new<F>(func: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> i64 + Send + Sync + 'static,
    {
        let func = Arc::new(func);
        let key = FunctionKey::of(&func);
        Lambda { func, key }
    }

    pub fn apply(&self, row: Row<'_>) -> i64 {
        (self.func)(row)
    }
}

impl BiPredicate {
    pub fn new<F>(func: F) -> Self
    where
        F: for<'a, 'b> Fn(Row<'a>, Row<'b>) -> bool + Send + Sync + 'static,
    {
        let func = Arc::new(func);
        let key = FunctionKey::of(&func);
        Lambda { func, key }
    }

    pub fn test(&self, left: Row<'_>, right: Row<'_>) -> bool {
        (self.func)(left, right)
    }
}

impl Flattener {
    pub fn new<F>(func: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Vec<Value> + Send + Sync + 'static,
    {
        let func = Arc::new(func);
        let key = FunctionKey::of(&func);
        Lambda { func, key }
    }

    pub fn apply(&self, row: Row<'_>) -> Vec<Value> {
        (self.func)(row)
    }
}
