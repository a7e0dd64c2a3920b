// Constraint factory: the entry point of the fluent stream API.

use std::sync::Arc;

use super::joiner::Joiner;
use super::{Stream, StreamOp};

// Creates the root streams of constraint definitions.
//
// Every constraint built from one factory lands in the factory's package,
// unless `as_constraint_in` names another one.
#[derive(Debug, Clone)]
pub struct ConstraintFactory {
    package: Arc<str>,
}

impl ConstraintFactory {
    // Creates a factory whose constraints have no package.
    pub fn new() -> Self {
        Self::with_package("")
    }

    pub fn with_package(package: impl Into<String>) -> Self {
        Self {
            package: Arc::from(package.into()),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    // One tuple per inserted instance of `class` (or of any subclass) that
    // passes the class's assignment filter.
    pub fn for_each(&self, class: &str) -> Stream {
        self.root(class, false)
    }

    // Like `for_each`, but unassigned entities are included.
    pub fn for_each_including_unassigned(&self, class: &str) -> Stream {
        self.root(class, true)
    }

    // Pairs (a, b) of assigned `class` instances with a's planning id
    // strictly below b's, that also satisfy every joiner.
    //
    // Each unordered pair appears once and no fact pairs with itself. The
    // class must declare a planning id.
    pub fn for_each_unique_pair(&self, class: &str, joiners: Vec<Joiner>) -> Stream {
        Stream::root(
            StreamOp::UniquePair {
                class: class.to_string(),
                joiners,
            },
            2,
            Arc::clone(&self.package),
        )
    }

    fn root(&self, class: &str, include_unassigned: bool) -> Stream {
        Stream::root(
            StreamOp::ForEach {
                class: class.to_string(),
                include_unassigned,
            },
            1,
            Arc::clone(&self.package),
        )
    }
}

impl Default for ConstraintFactory {
    fn default() -> Self {
        Self::new()
    }
}
