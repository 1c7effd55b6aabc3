use super::{RouteAdvertisement, RouteEntry, RoutingTable};
use crate::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteChange {
    pub destination: Address,
    pub previous: Option<RouteEntry>,
    pub current: RouteEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUpdateOutcome {
    pub table: RoutingTable,
    pub changes: Vec<RouteChange>,
}

impl RouteUpdateOutcome {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Bellman-Ford relaxation of `current` against a neighbor's advertisement
/// received on `interface`, whose link costs `link_cost`.
///
/// A destination is (re)routed through `interface` only when the advertised
/// cost plus `link_cost` is strictly lower than what the table holds, or when
/// the destination is new. The input table is left untouched.
pub fn process_routing_update(
    current: &RoutingTable,
    advertisement: &RouteAdvertisement,
    interface: usize,
    link_cost: u32,
) -> RouteUpdateOutcome {
    let mut table = current.clone();
    let mut changes = Vec::new();

    for (destination, advertised) in advertisement.iter() {
        let candidate = RouteEntry::new(interface, advertised.saturating_add(link_cost));
        let previous = table.get_route(destination).copied();

        let accept = match previous {
            Some(existing) => candidate.cost < existing.cost,
            None => true,
        };

        if accept {
            table.add_route(destination, candidate);
            changes.push(RouteChange {
                destination,
                previous,
                current: candidate,
            });
        }
    }

    RouteUpdateOutcome { table, changes }
}
