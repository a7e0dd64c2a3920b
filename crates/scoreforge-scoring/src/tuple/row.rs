use std::any::type_name;

use crate::fact::{FactRef, Value};

/// Read-only view of a tuple's elements, handed to user functions.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use scoreforge_scoring::fact::{FactRef, Value};
/// use scoreforge_scoring::tuple::Row;
///
/// #[derive(Debug)]
/// struct Shift { hours: i64 }
///
/// let values = [Value::from(FactRef::new(Arc::new(Shift { hours: 8 }))), Value::Int(3)];
/// let row = Row::new(&values);
/// assert_eq!(row.fact::<Shift>(0).hours, 8);
/// assert_eq!(row.get(1).as_int(), Some(3));
/// assert!(row.try_fact::<Shift>(1).is_none());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Row<'a>(&'a [Value]);

impl<'a> Row<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self(values)
    }

    pub fn len(self) -> usize {
        self.0.len()
    }

    pub fn is_empty(self) -> bool {
        self.0.is_empty()
    }

    /// Element at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds, like slice indexing.
    pub fn get(self, index: usize) -> &'a Value {
        &self.0[index]
    }

    pub fn try_get(self, index: usize) -> Option<&'a Value> {
        self.0.get(index)
    }

    /// Last element; `Null` for an empty row.
    pub fn last(self) -> &'a Value {
        const NULL: &Value = &Value::Null;
        self.0.last().unwrap_or(NULL)
    }

    /// Fact at `index`, downcast to `T`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds or the element is not a `T` fact.
    /// Use [`Row::try_fact`] when the stream mixes types.
    pub fn fact<T: 'static>(self, index: usize) -> &'a T {
        match self.try_fact::<T>(index) {
            Some(fact) => fact,
            None => panic!(
                "element {index} of {:?} is not a {} fact",
                self.0,
                type_name::<T>()
            ),
        }
    }

    pub fn try_fact<T: 'static>(self, index: usize) -> Option<&'a T> {
        self.0.get(index).and_then(Value::fact::<T>)
    }

    pub fn fact_ref(self, index: usize) -> Option<&'a FactRef> {
        self.0.get(index).and_then(Value::as_fact)
    }

    pub fn values(self) -> &'a [Value] {
        self.0
    }

    /// Facts contained in the row, in element order.
    pub fn facts(self) -> impl Iterator<Item = &'a FactRef> {
        self.0.iter().filter_map(Value::as_fact)
    }
}
