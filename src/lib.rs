//! Distance-vector routing over emulated point-to-point links.
//!
//! Hosts and routers exchange serialized packets through the inbound and
//! outbound queues of their [`network::Interface`]s. Routers learn paths by
//! relaxing the tables their neighbours advertise and forward DATA packets
//! along the cheapest known interface.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod host;
pub mod metrics;
pub mod network;
pub mod node;
pub mod protocol;
pub mod router;
pub mod simulation;

/// Node address carried in the 5-digit destination field of every packet.
pub type Address = u32;

pub use config::TopologyConfig;
pub use host::Host;
pub use network::{Direction, Interface, Link, Packet, Protocol};
pub use node::{run_node, Node};
pub use protocol::{RouteAdvertisement, RouteEntry, RoutingTable};
pub use router::{NoRoutePolicy, Router};
pub use simulation::{Network, SimulationReport};
