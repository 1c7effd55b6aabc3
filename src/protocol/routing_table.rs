use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Egress interface index.
    pub interface: usize,
    pub cost: u32,
}

impl RouteEntry {
    pub fn new(interface: usize, cost: u32) -> Self {
        Self { interface, cost }
    }
}

/// Destination -> best known (egress interface, cost). Entries never expire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    entries: BTreeMap<Address, RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts or replaces the route, returning the previous one.
    pub fn add_route(&mut self, destination: Address, entry: RouteEntry) -> Option<RouteEntry> {
        self.entries.insert(destination, entry)
    }

    pub fn get_route(&self, destination: Address) -> Option<&RouteEntry> {
        self.entries.get(&destination)
    }

    pub fn contains(&self, destination: Address) -> bool {
        self.entries.contains_key(&destination)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Routes in ascending destination order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &RouteEntry)> {
        self.entries.iter().map(|(dest, entry)| (*dest, entry))
    }

    /// Renders the table as a cost matrix: one column per destination, one row
    /// per interface, `-` where the interface is not the chosen egress.
    pub fn render(&self, interface_count: usize) -> String {
        let width = self
            .entries
            .iter()
            .map(|(dest, entry)| dest.to_string().len().max(entry.cost.to_string().len()))
            .max()
            .unwrap_or(1);

        let mut out = String::new();
        let _ = write!(out, "{:>9}", "Cost to");
        out.push('\n');
        let _ = write!(out, "{:9}", "");
        for dest in self.entries.keys() {
            let _ = write!(out, " {:>width$}", dest);
        }
        out.push('\n');

        for intf in 0..interface_count {
            let label = if intf == 0 { "From" } else { "" };
            let _ = write!(out, "{:<5}{:>4}", label, intf);
            for entry in self.entries.values() {
                if entry.interface == intf {
                    let _ = write!(out, " {:>width$}", entry.cost);
                } else {
                    let _ = write!(out, " {:>width$}", "-");
                }
            }
            out.push('\n');
        }

        out
    }
}

impl FromIterator<(Address, RouteEntry)> for RoutingTable {
    fn from_iter<I: IntoIterator<Item = (Address, RouteEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_entry_per_destination() {
        let mut table = RoutingTable::new();
        assert_eq!(table.add_route(3, RouteEntry::new(0, 5)), None);
        assert_eq!(
            table.add_route(3, RouteEntry::new(1, 2)),
            Some(RouteEntry::new(0, 5))
        );

        assert_eq!(table.len(), 1);
        assert_eq!(table.get_route(3), Some(&RouteEntry::new(1, 2)));
    }

    #[test]
    fn test_iter_is_ordered() {
        let table: RoutingTable = [
            (9, RouteEntry::new(0, 1)),
            (2, RouteEntry::new(1, 3)),
            (5, RouteEntry::new(0, 0)),
        ]
        .into_iter()
        .collect();

        let dests: Vec<Address> = table.iter().map(|(dest, _)| dest).collect();
        assert_eq!(dests, vec![2, 5, 9]);
    }

    #[test]
    fn test_render_matrix() {
        let table: RoutingTable = [(1, RouteEntry::new(0, 0)), (2, RouteEntry::new(1, 3))]
            .into_iter()
            .collect();

        let rendered = table.render(2);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].trim(), "Cost to");
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), vec!["From", "0", "0", "-"]);
        assert_eq!(lines[3].split_whitespace().collect::<Vec<_>>(), vec!["1", "-", "3"]);
    }

    #[test]
    fn test_render_empty_table() {
        let rendered = RoutingTable::new().render(1);
        assert_eq!(rendered.lines().count(), 3);
    }
}
