use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Directed weighted adjacency list keyed by node name.
pub type CostGraph = HashMap<String, Vec<(String, u32)>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortestPath {
    pub cost: u32,
    pub next_hop: Option<String>,
    pub path: Vec<String>,
}

#[derive(Debug)]
struct State {
    cost: u32,
    node: String,
    path: Vec<String>,
}

impl Eq for State {}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other.cost.cmp(&self.cost)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest paths from `source` to every reachable node, `source` included
/// with cost 0.
pub fn calculate_shortest_paths(graph: &CostGraph, source: &str) -> HashMap<String, ShortestPath> {
    let mut best: HashMap<String, ShortestPath> = HashMap::new();
    let mut heap = BinaryHeap::new();

    heap.push(State {
        cost: 0,
        node: source.to_string(),
        path: vec![source.to_string()],
    });

    while let Some(State { cost, node, path }) = heap.pop() {
        if best.contains_key(&node) {
            continue;
        }

        for (neighbor, link_cost) in graph.get(&node).into_iter().flatten() {
            if best.contains_key(neighbor) {
                continue;
            }
            let mut new_path = path.clone();
            new_path.push(neighbor.clone());
            heap.push(State {
                cost: cost.saturating_add(*link_cost),
                node: neighbor.clone(),
                path: new_path,
            });
        }

        best.insert(
            node,
            ShortestPath {
                cost,
                next_hop: path.get(1).cloned(),
                path,
            },
        );
    }

    best
}
