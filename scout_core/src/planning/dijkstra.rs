// scout_core/src/planning/dijkstra.rs

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BinaryHeap},
};

type Cost = f64;

// Heap entry. Ordering is reversed so `BinaryHeap` pops the cheapest node;
// equal costs pop the smallest node first so results do not depend on
// insertion order.
#[derive(Debug, Clone)]
struct DijkstraItem<N> {
    node: N,
    cost: Cost,
}

impl<N: Ord> Eq for DijkstraItem<N> {}
impl<N: Ord> PartialEq for DijkstraItem<N> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<N: Ord> Ord for DijkstraItem<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}
impl<N: Ord> PartialOrd for DijkstraItem<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cheapest path from `start` to the first node accepted by `is_goal`.
///
/// Returns the node sequence (start included) and its total cost, or `None`
/// when no goal is reachable. Edges with negative or non-finite cost are ignored.
pub fn plan<N, FN, IT>(
    start: &N,
    mut is_goal: impl FnMut(&N) -> bool,
    get_neighbors: &mut FN,
) -> Option<(Vec<N>, Cost)>
where
    N: Ord + Clone,
    FN: FnMut(&N) -> IT,
    IT: IntoIterator<Item = (N, Cost)>,
{
    let mut best: BTreeMap<N, Cost> = BTreeMap::new();
    let mut parents: BTreeMap<N, N> = BTreeMap::new();
    let mut open_set = BinaryHeap::new();

    best.insert(start.clone(), 0.0);
    open_set.push(DijkstraItem {
        node: start.clone(),
        cost: 0.0,
    });

    while let Some(DijkstraItem { node, cost }) = open_set.pop() {
        // Skip entries superseded by a cheaper push.
        if best.get(&node).is_some_and(|&known| cost > known) {
            continue;
        }

        if is_goal(&node) {
            return Some((calculate_final_path(node, &parents), cost));
        }

        for (neighbor, move_cost) in get_neighbors(&node) {
            if !move_cost.is_finite() || move_cost < 0.0 {
                continue;
            }
            let new_cost = cost + move_cost;
            let improved = best.get(&neighbor).map_or(true, |&known| new_cost < known);
            if improved {
                best.insert(neighbor.clone(), new_cost);
                parents.insert(neighbor.clone(), node.clone());
                open_set.push(DijkstraItem {
                    node: neighbor,
                    cost: new_cost,
                });
            }
        }
    }

    None
}

fn calculate_final_path<N: Ord + Clone>(goal: N, parents: &BTreeMap<N, N>) -> Vec<N> {
    let mut path = vec![goal];
    while let Some(parent) = path.last().and_then(|node| parents.get(node)) {
        path.push(parent.clone());
    }
    path.reverse(); // start -> goal
    path
}
