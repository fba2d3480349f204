//! Error types for gantry-geometry

use thiserror::Error;

/// Result type for gantry-geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while registering, building or placing components
#[derive(Debug, Error)]
pub enum Error {
    /// Two components share a category
    #[error("duplicate component: at least two components have category {0:?}")]
    DuplicateCategory(String),

    /// A second component claims the world
    #[error("component {category:?} claims the root, but {existing:?} already does")]
    DuplicateRoot { existing: String, category: String },

    #[error("no {kind} found for {name:?}")]
    NotFound { kind: String, name: String },

    /// The mother of a component is not registered, or not yet placed
    #[error(
        "no mother volume found for component with category {category:?}, \
         which wanted a mother of category {mother:?}"
    )]
    MissingMother { category: String, mother: String },

    /// The mother graph has no valid placement order
    #[error("mother categories form a cycle: {}", categories.join(", "))]
    DependencyCycle { categories: Vec<String> },

    /// No component claims the root, or the root is not placed yet
    #[error("no world volume found")]
    NoRoot,

    #[error("logical volumes have not been built")]
    NotBuilt,

    #[error("logical volumes were already built")]
    AlreadyBuilt,

    #[error("physical volumes were already placed")]
    AlreadyPlaced,

    /// Registration after building started
    #[error("geometry is sealed; component {0:?} registered too late")]
    Sealed(String),

    /// A component's own build, place or hit conversion failed
    #[error("component {category:?} failed: {message}")]
    Component { category: String, message: String },

    #[error("core error: {0}")]
    Core(#[from] gantry_core::Error),
}

impl Error {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a component failure, used by component authors
    pub fn component(category: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Component {
            category: category.into(),
            message: message.into(),
        }
    }
}

fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
