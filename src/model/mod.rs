mod diagram;
mod port;
pub mod snapshot;
mod types;

pub use diagram::{Connection, Diagram, Node, NodeKind, PRIMARY_PROCESS_TITLES, ViewTransform};
pub use port::{
    PROCESS_PORTS, Port, PortRegistry, PortTemplate, process_facing_side, resource_ports,
};
pub use snapshot::{DiagramSnapshot, SNAPSHOT_VERSION};
pub use types::*;
