//! Error types for gantry-core

use crate::capability::Capability;
use crate::output::Scope;
use thiserror::Error;

/// Core error type
///
/// Every variant is fatal for the job: registration and setup errors surface
/// before the first run, and plugin errors abort the run they occur in.
#[derive(Error, Debug)]
pub enum Error {
    #[error("duplicate plugin: at least two {capability} plugins are named {name:?}")]
    DuplicateName { capability: Capability, name: String },

    #[error("no {kind} found with name {name:?}")]
    NotFound { kind: String, name: String },

    #[error("plugin {plugin:?} registered as {capability} but does not declare that capability")]
    UndeclaredCapability {
        plugin: String,
        capability: Capability,
    },

    #[error("plugin {0:?} declares no capabilities")]
    NoCapabilities(String),

    #[error("plugin {plugin:?} declares {capability} but was never registered under it")]
    UnregisteredCapability {
        plugin: String,
        capability: Capability,
    },

    #[error("registry is sealed; plugin {0:?} must be registered before initialization")]
    RegistrySealed(String),

    #[error("setup order violated: {0}")]
    SetupOrder(String),

    #[error("plugin {0:?} re-entered the registry while it was being dispatched")]
    PluginBusy(String),

    #[error("{type_name}::{method} was called but not overridden")]
    UnimplementedOverride {
        type_name: &'static str,
        method: &'static str,
    },

    #[error("a physics list is already registered")]
    PhysicsListAlreadyRegistered,

    #[error("no physics list has been registered")]
    NoPhysicsList,

    #[error("output {producer}/{instance} ({scope}) declared twice")]
    DuplicateOutput {
        producer: String,
        instance: String,
        scope: Scope,
    },

    #[error("output {producer}/{instance} ({scope}) was never declared")]
    UndeclaredOutput {
        producer: String,
        instance: String,
        scope: Scope,
    },

    #[error("plugin {plugin:?} failed: {message}")]
    Plugin { plugin: String, message: String },
}

impl Error {
    /// Create a `NotFound` error for the given kind of object
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a plugin failure, used by plugin authors to abort the run
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
