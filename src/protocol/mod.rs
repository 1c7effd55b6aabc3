//! Distance-vector routing: the routing table, the advertisement carried in
//! CONTROL packets, and the relaxation step applied when one arrives.

pub mod messages;
pub mod route_manager;
pub mod routing_table;

pub use messages::RouteAdvertisement;
pub use route_manager::{process_routing_update, RouteChange, RouteUpdateOutcome};
pub use routing_table::{RouteEntry, RoutingTable};

use crate::Address;

/// Destination written on CONTROL packets. Routers consume them on the
/// receiving link and never forward them.
pub const CONTROL_DESTINATION: Address = 0;
