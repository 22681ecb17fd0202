//! Requirement tokens: opaque identities of exclusively-usable resources.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use uuid::Uuid;

struct RequirementInner {
    id: Uuid,
    name: String,
}

/// Opaque handle to a resource that at most one admitted command may hold.
///
/// Identity is the token itself: clones compare equal, while two tokens
/// created with the same name are distinct resources.
#[derive(Clone)]
pub struct Requirement {
    inner: Arc<RequirementInner>,
}

impl Requirement {
    /// Create a new, unique requirement token. The name is only used for logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RequirementInner {
                id: Uuid::new_v4(),
                name: name.into(),
            }),
        }
    }

    /// Human-readable name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Unique identity of this token.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }
}

impl PartialEq for Requirement {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Requirement {}

impl Hash for Requirement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .finish()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}
