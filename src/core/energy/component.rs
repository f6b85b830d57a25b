use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EcoflocError;

/// Hardware subsystem that energy is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Processor,
    Graphics,
    Storage,
    Network,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Processor,
        Component::Graphics,
        Component::Storage,
        Component::Network,
    ];

    /// Stable slot used by per-component arrays
    pub const fn index(self) -> usize {
        match self {
            Component::Processor => 0,
            Component::Graphics => 1,
            Component::Storage => 2,
            Component::Network => 3,
        }
    }

    /// Console label
    pub const fn label(self) -> &'static str {
        match self {
            Component::Processor => "CPU",
            Component::Graphics => "GPU",
            Component::Storage => "SD",
            Component::Network => "NIC",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Component {
    type Err = EcoflocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CPU" => Ok(Component::Processor),
            "GPU" => Ok(Component::Graphics),
            "SD" => Ok(Component::Storage),
            "NIC" => Ok(Component::Network),
            other => Err(EcoflocError::UnknownComponent(other.to_string())),
        }
    }
}

/// Set of enabled components
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSet([bool; 4]);

impl ComponentSet {
    pub fn only(component: Component) -> Self {
        let mut set = Self::default();
        set.insert(component);
        set
    }

    pub fn insert(&mut self, component: Component) {
        self.0[component.index()] = true;
    }

    pub fn remove(&mut self, component: Component) {
        self.0[component.index()] = false;
    }

    pub fn contains(&self, component: Component) -> bool {
        self.0[component.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = Component> + '_ {
        Component::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

/// One value per component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerComponent<T>([T; 4]);

impl<T: Copy> PerComponent<T> {
    pub fn get(&self, component: Component) -> T {
        self.0[component.index()]
    }
}

impl<T> PerComponent<T> {
    pub fn get_mut(&mut self, component: Component) -> &mut T {
        &mut self.0[component.index()]
    }
}
