use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

id_type!(
    /// Stable for the node's lifetime. Allocated in creation order.
    NodeId
);
id_type!(
    /// Unique within the diagram.
    PortId
);
id_type!(ConnectionId);

/// A position in diagram coordinates (top-left corner for nodes).
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    /// The side a port is drawn on under the given orientation.
    ///
    /// Landscape keeps the canonical side. Portrait rotates the flow axis so
    /// inputs enter from the top and outputs leave at the bottom.
    pub fn oriented(self, orientation: Orientation) -> Side {
        match orientation {
            Orientation::Landscape => self,
            Orientation::Portrait => match self {
                Side::Left => Side::Top,
                Side::Right => Side::Bottom,
                Side::Bottom => Side::Right,
                Side::Top => Side::Left,
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Portrait only when strictly taller than wide.
    pub fn from_viewport(width: f32, height: f32) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Input,
    Output,
    Machine,
    Energy,
    Gas,
    Water,
    Service,
    Property,
}

/// Which part of the layout a resource belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceRole {
    Input,
    Output,
    Mechanism,
}

impl ResourceKind {
    pub const MECHANISMS: [ResourceKind; 6] = [
        ResourceKind::Machine,
        ResourceKind::Energy,
        ResourceKind::Gas,
        ResourceKind::Water,
        ResourceKind::Service,
        ResourceKind::Property,
    ];

    pub fn role(self) -> ResourceRole {
        match self {
            ResourceKind::Input => ResourceRole::Input,
            ResourceKind::Output => ResourceRole::Output,
            _ => ResourceRole::Mechanism,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Input => "Input",
            ResourceKind::Output => "Output",
            ResourceKind::Machine => "Machine",
            ResourceKind::Energy => "Energy",
            ResourceKind::Gas => "Gas",
            ResourceKind::Water => "Water",
            ResourceKind::Service => "Service",
            ResourceKind::Property => "Property",
        }
    }

    /// Field path of the process port a resource of this kind plugs into by default.
    pub fn process_field_path(self) -> &'static str {
        match self {
            ResourceKind::Input => "input.material",
            ResourceKind::Output => "output.product",
            ResourceKind::Machine => "mechanism.machine",
            ResourceKind::Energy => "mechanism.energy",
            ResourceKind::Gas => "mechanism.gas",
            ResourceKind::Water => "mechanism.water",
            ResourceKind::Service => "mechanism.service",
            ResourceKind::Property => "mechanism.property",
        }
    }

    /// Editable data fields shown on the node. Free-form, not read by layout.
    pub fn default_fields(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Input | ResourceKind::Output => &["name", "quantity", "unit"],
            ResourceKind::Machine => &["name", "power", "capacity"],
            ResourceKind::Energy => &["source", "amount", "unit"],
            ResourceKind::Gas => &["medium", "flow", "unit"],
            ResourceKind::Water => &["quality", "flow", "unit"],
            ResourceKind::Service => &["provider", "description"],
            ResourceKind::Property => &["key", "value"],
        }
    }
}
