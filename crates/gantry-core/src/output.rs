//! Output slots declared up front and filled per event or per run
//!
//! The surrounding event-processing system reserves schema slots before any
//! run starts. Plugins declare what they will produce through an
//! [`OutputCollector`], then write into an [`OutputRecord`] at each event or
//! run boundary. Writing into a slot that was never declared is an error.

use crate::error::{Error, Result};
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an output lives in the per-event or per-run record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Event,
    Run,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Event => write!(f, "event"),
            Scope::Run => write!(f, "run"),
        }
    }
}

/// A declared output slot: producing plugin name plus instance label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputKey {
    pub producer: String,
    pub instance: String,
}

impl OutputKey {
    pub fn new(producer: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.producer, self.instance)
    }
}

/// Setup-time callback surface used by `declare_outputs`
#[derive(Debug, Clone, Default)]
pub struct OutputCollector {
    event: IndexSet<OutputKey>,
    run: IndexSet<OutputKey>,
}

impl OutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot; declaring the same slot twice is an error
    pub fn declare(
        &mut self,
        producer: impl Into<String>,
        instance: impl Into<String>,
        scope: Scope,
    ) -> Result<()> {
        let key = OutputKey::new(producer, instance);
        let slots = match scope {
            Scope::Event => &mut self.event,
            Scope::Run => &mut self.run,
        };
        if slots.contains(&key) {
            return Err(Error::DuplicateOutput {
                producer: key.producer,
                instance: key.instance,
                scope,
            });
        }
        tracing::debug!(output = %key, %scope, "declared output");
        slots.insert(key);
        Ok(())
    }

    /// Check whether a slot has been declared
    pub fn is_declared(&self, producer: &str, instance: &str, scope: Scope) -> bool {
        let key = OutputKey::new(producer, instance);
        match scope {
            Scope::Event => self.event.contains(&key),
            Scope::Run => self.run.contains(&key),
        }
    }

    /// Declared slots for a scope, in declaration order
    pub fn declared(&self, scope: Scope) -> impl Iterator<Item = &OutputKey> {
        match scope {
            Scope::Event => self.event.iter(),
            Scope::Run => self.run.iter(),
        }
    }

    /// Total number of declared slots across both scopes
    pub fn len(&self) -> usize {
        self.event.len() + self.run.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fresh record for one event
    pub fn event_record(&self) -> OutputRecord {
        OutputRecord::new(Scope::Event, self.event.clone())
    }

    /// Fresh record for one run
    pub fn run_record(&self) -> OutputRecord {
        OutputRecord::new(Scope::Run, self.run.clone())
    }
}

/// Per-event or per-run output record written by plugins
#[derive(Debug, Clone)]
pub struct OutputRecord {
    scope: Scope,
    declared: IndexSet<OutputKey>,
    values: IndexMap<OutputKey, Value>,
}

impl OutputRecord {
    fn new(scope: Scope, declared: IndexSet<OutputKey>) -> Self {
        Self {
            scope,
            declared,
            values: IndexMap::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Store a product into a declared slot, replacing any earlier value
    pub fn put(
        &mut self,
        producer: impl Into<String>,
        instance: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let key = OutputKey::new(producer, instance);
        if !self.declared.contains(&key) {
            return Err(Error::UndeclaredOutput {
                producer: key.producer,
                instance: key.instance,
                scope: self.scope,
            });
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    /// Read back a stored product
    pub fn get(&self, producer: &str, instance: &str) -> Option<&Value> {
        self.values.get(&OutputKey::new(producer, instance))
    }

    /// Stored products in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&OutputKey, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
