//! Minimal grouped entity.
//!
//! # Example
//!
//! ```
//! use scoreforge_test::entity::GroupedEntity;
//!
//! let e = GroupedEntity::new("E1", Some("G1"));
//! assert_eq!(e.group().as_deref(), Some("G1"));
//! e.set_group(None);
//! assert!(e.group().is_none());
//! ```

use std::sync::{PoisonError, RwLock};

/// An entity whose single planning variable is an optional group name.
#[derive(Debug)]
pub struct GroupedEntity {
    pub name: String,
    group: RwLock<Option<String>>,
}

impl GroupedEntity {
    pub fn new(name: &str, group: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            group: RwLock::new(group.map(str::to_string)),
        }
    }

    pub fn group(&self) -> Option<String> {
        self.group
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_group(&self, group: Option<&str>) {
        *self.group.write().unwrap_or_else(PoisonError::into_inner) = group.map(str::to_string);
    }
}
