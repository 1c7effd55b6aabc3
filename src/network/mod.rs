pub mod interface;
pub mod packet;
pub mod topology;

pub use interface::{Direction, Interface};
pub use packet::{Packet, Protocol};
pub use topology::{Endpoint, Link};
