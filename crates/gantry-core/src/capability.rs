//! Lifecycle capability tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six fixed lifecycle interfaces a plugin can implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Begin/end of run hooks
    RunLifecycle,
    /// Begin/end of event hooks
    EventLifecycle,
    /// Pre/post tracking hooks
    TrackingLifecycle,
    /// Per-step hook
    SteppingLifecycle,
    /// New-track kill filter
    StackFilter,
    /// Primary particle generation
    PrimaryGenerator,
}

impl Capability {
    /// All capabilities in dispatch-table order
    pub const ALL: [Capability; 6] = [
        Capability::RunLifecycle,
        Capability::EventLifecycle,
        Capability::TrackingLifecycle,
        Capability::SteppingLifecycle,
        Capability::StackFilter,
        Capability::PrimaryGenerator,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Short label used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::RunLifecycle => "run",
            Capability::EventLifecycle => "event",
            Capability::TrackingLifecycle => "tracking",
            Capability::SteppingLifecycle => "stepping",
            Capability::StackFilter => "stacking",
            Capability::PrimaryGenerator => "primary generator",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Set of capabilities a plugin declares it implements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// The empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set holding exactly one capability
    pub fn only(capability: Capability) -> Self {
        Self(capability.bit())
    }

    /// Builder-style insertion
    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    /// Add a capability
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    /// Check membership
    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Check if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of declared capabilities
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate declared capabilities in [`Capability::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl From<Capability> for CapabilitySet {
    fn from(capability: Capability) -> Self {
        Self::only(capability)
    }
}
