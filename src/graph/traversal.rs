//! Step-at-a-time graph search.
//!
//! A `Traversal` is a lazy, fused iterator: one `Visit` per settled node,
//! then exactly one `PathFound` or `Unreachable`, then `None` forever.
//! All four algorithms share a single frontier of entries; they differ only
//! in which entry is popped next and when a neighbour is allowed in.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Graph;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Bfs,
    Dfs,
    Dijkstra,
    #[value(name = "astar")]
    AStar,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Bfs => "bfs",
            Algorithm::Dfs => "dfs",
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::AStar => "astar",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Reconstructing,
    Done,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraversalEvent {
    /// `node` was settled; `frontier` lists the nodes still waiting, in pop
    /// order for BFS/DFS and insertion order for the weighted searches.
    Visit {
        node: usize,
        frontier: Vec<usize>,
        distance: f64,
    },
    PathFound {
        path: Vec<usize>,
        cost: f64,
    },
    Unreachable,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    node: usize,
    parent: Option<usize>,
    cost: f64,
    priority: f64,
    seq: u64,
}

pub struct Traversal<'g> {
    graph: &'g Graph,
    algorithm: Algorithm,
    start: usize,
    goal: usize,
    phase: Phase,
    frontier: VecDeque<Entry>,
    seq: u64,
    settled: Vec<bool>,
    best: Vec<f64>,
    parent: Vec<Option<usize>>,
}

impl<'g> Traversal<'g> {
    pub fn new(graph: &'g Graph, algorithm: Algorithm, start: usize, goal: usize) -> Self {
        let n = graph.len();
        Self {
            graph,
            algorithm,
            start,
            goal,
            phase: Phase::Idle,
            frontier: VecDeque::new(),
            seq: 0,
            settled: vec![false; n],
            best: vec![f64::INFINITY; n],
            parent: vec![None; n],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn is_settled(&self, node: usize) -> bool {
        self.settled.get(node).copied().unwrap_or(false)
    }

    fn heuristic(&self, node: usize) -> f64 {
        match self.algorithm {
            Algorithm::AStar => self.graph.euclidean(node, self.goal),
            _ => 0.0,
        }
    }

    fn push(&mut self, node: usize, parent: Option<usize>, cost: f64) {
        let entry = Entry {
            node,
            parent,
            cost,
            priority: cost + self.heuristic(node),
            seq: self.seq,
        };
        self.seq += 1;
        self.frontier.push_back(entry);
    }

    /// Minimum priority, earliest insertion on ties.
    fn pop_min(&mut self) -> Option<Entry> {
        let idx = self
            .frontier
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.priority.total_cmp(&b.priority).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        self.frontier.remove(idx)
    }

    fn pop_next(&mut self) -> Option<Entry> {
        loop {
            let entry = match self.algorithm {
                Algorithm::Bfs => self.frontier.pop_front(),
                Algorithm::Dfs => self.frontier.pop_back(),
                Algorithm::Dijkstra | Algorithm::AStar => self.pop_min(),
            }?;
            if !self.settled[entry.node] {
                return Some(entry);
            }
        }
    }

    fn expand(&mut self, node: usize, cost: f64) {
        let graph = self.graph;
        let neighbors = graph.neighbors(node);
        match self.algorithm {
            Algorithm::Bfs => {
                for &(next, w) in neighbors {
                    if !self.settled[next] && self.best[next].is_infinite() {
                        self.best[next] = cost + w;
                        self.push(next, Some(node), cost + w);
                    }
                }
            }
            // Reversed so the first listed neighbour ends on top of the stack.
            Algorithm::Dfs => {
                for &(next, w) in neighbors.iter().rev() {
                    if !self.settled[next] {
                        self.push(next, Some(node), cost + w);
                    }
                }
            }
            Algorithm::Dijkstra | Algorithm::AStar => {
                for &(next, w) in neighbors {
                    let candidate = cost + w;
                    if !self.settled[next] && candidate < self.best[next] {
                        self.best[next] = candidate;
                        self.push(next, Some(node), candidate);
                    }
                }
            }
        }
    }

    fn frontier_nodes(&self) -> Vec<usize> {
        let mut seen = vec![false; self.graph.len()];
        let mut out = Vec::new();
        let mut record = |e: &Entry| {
            if !self.settled[e.node] && !seen[e.node] {
                seen[e.node] = true;
                out.push(e.node);
            }
        };
        match self.algorithm {
            Algorithm::Dfs => self.frontier.iter().rev().for_each(&mut record),
            _ => self.frontier.iter().for_each(&mut record),
        }
        out
    }

    fn reconstruct(&self) -> Vec<usize> {
        let mut path = vec![self.goal];
        let mut cur = self.goal;
        while let Some(p) = self.parent[cur] {
            path.push(p);
            cur = p;
        }
        path.reverse();
        path
    }

    fn finish_unreachable(&mut self) -> Option<TraversalEvent> {
        debug!(algorithm = self.algorithm.name(), start = self.start, goal = self.goal, "goal unreachable");
        self.phase = Phase::Done;
        self.frontier.clear();
        Some(TraversalEvent::Unreachable)
    }
}

impl Iterator for Traversal<'_> {
    type Item = TraversalEvent;

    fn next(&mut self) -> Option<TraversalEvent> {
        match self.phase {
            Phase::Idle => {
                let n = self.graph.len();
                if self.start >= n || self.goal >= n {
                    return self.finish_unreachable();
                }
                self.phase = Phase::Running;
                self.best[self.start] = 0.0;
                self.push(self.start, None, 0.0);
                self.next()
            }
            Phase::Running => {
                let Some(entry) = self.pop_next() else {
                    return self.finish_unreachable();
                };
                self.settled[entry.node] = true;
                self.parent[entry.node] = entry.parent;
                self.best[entry.node] = entry.cost;
                if entry.node == self.goal {
                    self.phase = Phase::Reconstructing;
                } else {
                    self.expand(entry.node, entry.cost);
                }
                Some(TraversalEvent::Visit {
                    node: entry.node,
                    frontier: self.frontier_nodes(),
                    distance: entry.cost,
                })
            }
            Phase::Reconstructing => {
                self.phase = Phase::Done;
                let path = self.reconstruct();
                let cost = self.best[self.goal];
                debug!(algorithm = self.algorithm.name(), hops = path.len() - 1, cost, "path found");
                self.frontier.clear();
                Some(TraversalEvent::PathFound { path, cost })
            }
            Phase::Done => None,
        }
    }
}

impl std::iter::FusedIterator for Traversal<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(graph: &Graph, algorithm: Algorithm, start: usize, goal: usize) -> Vec<TraversalEvent> {
        Traversal::new(graph, algorithm, start, goal).collect()
    }

    fn outcome(events: &[TraversalEvent]) -> Option<(Vec<usize>, f64)> {
        match events.last() {
            Some(TraversalEvent::PathFound { path, cost }) => Some((path.clone(), *cost)),
            _ => None,
        }
    }

    fn visits(events: &[TraversalEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                TraversalEvent::Visit { node, .. } => Some(*node),
                _ => None,
            })
            .collect()
    }

    /// 0 -1- 1 -1- 2, plus a heavy shortcut 0 -5- 2 and a cheap detour via 3.
    fn weighted() -> Graph {
        let mut g = Graph::new();
        let a = g.add_node(0.0, 0.0);
        let b = g.add_node(1.0, 0.0);
        let c = g.add_node(2.0, 0.0);
        let d = g.add_node(1.0, 1.0);
        g.add_edge(a, c, 5.0);
        g.add_edge(a, b, 1.0);
        g.add_edge(b, c, 3.0);
        g.add_edge(a, d, 1.0);
        g.add_edge(d, c, 1.5);
        g
    }

    #[test]
    fn test_bfs_shortest_hops() {
        let g = Graph::grid(4, 4, &[]);
        let events = run(&g, Algorithm::Bfs, 0, 15);
        let (path, cost) = outcome(&events).expect("path");
        assert_eq!(path.first(), Some(&0));
        assert_eq!(path.last(), Some(&15));
        assert_eq!(path.len() - 1, 6);
        assert_eq!(cost, 6.0);
    }

    #[test]
    fn test_bfs_visits_in_layers() {
        let g = Graph::grid(3, 3, &[]);
        let order = visits(&run(&g, Algorithm::Bfs, 4, 99));
        // Invalid goal ends immediately.
        assert!(order.is_empty());
        let order = visits(&run(&g, Algorithm::Bfs, 4, 0));
        assert_eq!(&order[..5], &[4, 5, 7, 3, 1]);
    }

    #[test]
    fn test_dfs_follows_first_neighbor() {
        let g = Graph::grid(3, 3, &[]);
        let order = visits(&run(&g, Algorithm::Dfs, 0, 8));
        // Always right first, then down.
        assert_eq!(&order[..3], &[0, 1, 2]);
        assert_eq!(order[3], 5);
        let (path, _) = outcome(&run(&g, Algorithm::Dfs, 0, 8)).expect("path");
        assert_eq!(path, vec![0, 1, 2, 5, 8]);
    }

    #[test]
    fn test_dijkstra_minimal_cost() {
        let g = weighted();
        let (path, cost) = outcome(&run(&g, Algorithm::Dijkstra, 0, 2)).expect("path");
        assert_eq!(path, vec![0, 3, 2]);
        assert!((cost - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_astar_matches_dijkstra_cost() {
        let g = Graph::grid(6, 5, &[2, 8, 14, 20]);
        let (_, d_cost) = outcome(&run(&g, Algorithm::Dijkstra, 0, 29)).expect("dijkstra path");
        let a_events = run(&g, Algorithm::AStar, 0, 29);
        let (_, a_cost) = outcome(&a_events).expect("astar path");
        assert_eq!(d_cost, a_cost);
        let d_visits = visits(&run(&g, Algorithm::Dijkstra, 0, 29)).len();
        assert!(visits(&a_events).len() <= d_visits);
    }

    #[test]
    fn test_unreachable_goal() {
        // Column x=2 fully walled on a 5x3 grid.
        let g = Graph::grid(5, 3, &[2, 7, 12]);
        for algorithm in [Algorithm::Bfs, Algorithm::Dfs, Algorithm::Dijkstra, Algorithm::AStar] {
            let events = run(&g, algorithm, 0, 4);
            assert_eq!(events.last(), Some(&TraversalEvent::Unreachable), "{:?}", algorithm);
            // Only the left block (2 columns x 3 rows) gets settled.
            assert_eq!(visits(&events).len(), 6, "{:?}", algorithm);
        }
    }

    #[test]
    fn test_start_equals_goal() {
        let g = Graph::grid(2, 2, &[]);
        let events = run(&g, Algorithm::AStar, 3, 3);
        assert_eq!(events.len(), 2);
        assert_eq!(outcome(&events), Some((vec![3], 0.0)));
    }

    #[test]
    fn test_ties_pop_in_insertion_order() {
        // Star: all spokes cost 1, so settle order is adjacency order.
        let mut g = Graph::new();
        let hub = g.add_node(0.0, 0.0);
        let spokes: Vec<usize> = (0..4).map(|i| g.add_node(i as f64, 1.0)).collect();
        for &s in &spokes {
            g.add_edge(hub, s, 1.0);
        }
        let order = visits(&run(&g, Algorithm::Dijkstra, hub, 99));
        assert!(order.is_empty());
        let order = visits(&run(&g, Algorithm::Dijkstra, hub, spokes[3]));
        assert_eq!(order, vec![hub, spokes[0], spokes[1], spokes[2], spokes[3]]);
    }

    #[test]
    fn test_phases_and_fused() {
        let g = Graph::grid(2, 1, &[]);
        let mut t = Traversal::new(&g, Algorithm::Bfs, 0, 1);
        assert_eq!(t.phase(), Phase::Idle);
        assert!(matches!(t.next(), Some(TraversalEvent::Visit { node: 0, .. })));
        assert_eq!(t.phase(), Phase::Running);
        assert!(matches!(t.next(), Some(TraversalEvent::Visit { node: 1, .. })));
        assert_eq!(t.phase(), Phase::Reconstructing);
        assert!(matches!(t.next(), Some(TraversalEvent::PathFound { .. })));
        assert_eq!(t.phase(), Phase::Done);
        assert_eq!(t.next(), None);
        assert_eq!(t.next(), None);
    }

    #[test]
    fn test_visit_reports_frontier() {
        let g = Graph::grid(3, 3, &[]);
        let mut t = Traversal::new(&g, Algorithm::Bfs, 4, 0);
        match t.next() {
            Some(TraversalEvent::Visit { node, frontier, distance }) => {
                assert_eq!(node, 4);
                assert_eq!(frontier, vec![5, 7, 3, 1]);
                assert_eq!(distance, 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
