pub mod driver;
pub mod traversal;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use driver::{spawn_traversal, DriveSummary, StepDriver};
pub use traversal::{Algorithm, Phase, Traversal, TraversalEvent};

/// Node position, used for drawing and the A* heuristic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub x: f64,
    pub y: f64,
}

/// Weighted adjacency-list graph. Neighbour order is insertion order and is
/// the expansion order for BFS/DFS.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, x: f64, y: f64) -> usize {
        self.nodes.push(Node { x, y });
        self.adjacency.push(Vec::new());
        self.nodes.len() - 1
    }

    /// Directed edge. Out-of-range endpoints are ignored.
    pub fn add_arc(&mut self, from: usize, to: usize, weight: f64) {
        if from < self.nodes.len() && to < self.nodes.len() {
            self.adjacency[from].push((to, weight));
        }
    }

    /// Undirected edge.
    pub fn add_edge(&mut self, a: usize, b: usize, weight: f64) {
        self.add_arc(a, b, weight);
        self.add_arc(b, a, weight);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, i: usize) -> Option<Node> {
        self.nodes.get(i).copied()
    }

    pub fn neighbors(&self, i: usize) -> &[(usize, f64)] {
        self.adjacency.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Straight-line distance between two nodes.
    pub fn euclidean(&self, a: usize, b: usize) -> f64 {
        match (self.node(a), self.node(b)) {
            (Some(p), Some(q)) => ((p.x - q.x).powi(2) + (p.y - q.y).powi(2)).sqrt(),
            _ => 0.0,
        }
    }

    /// 4-connected `width` x `height` grid with unit weights. Cells listed in
    /// `walls` (as y * width + x) keep their node but get no edges. Node index
    /// is `y * width + x`; neighbours are added right, down, left, up.
    pub fn grid(width: usize, height: usize, walls: &[usize]) -> Self {
        let mut g = Graph::new();
        for y in 0..height {
            for x in 0..width {
                g.add_node(x as f64, y as f64);
            }
        }
        let open = |i: usize| !walls.contains(&i);
        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                if !open(i) {
                    continue;
                }
                let mut push = |nx: isize, ny: isize| {
                    if nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height {
                        let j = ny as usize * width + nx as usize;
                        if open(j) {
                            g.add_arc(i, j, 1.0);
                        }
                    }
                };
                let (xi, yi) = (x as isize, y as isize);
                push(xi + 1, yi);
                push(xi, yi + 1);
                push(xi - 1, yi);
                push(xi, yi - 1);
            }
        }
        g
    }
}

/// Seeded random wall cells for a `width` x `height` grid. Cells in `keep`
/// are never walled.
pub fn random_walls(width: usize, height: usize, density: f64, seed: u64, keep: &[usize]) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let p = density.clamp(0.0, 1.0);
    (0..width * height)
        .filter(|i| {
            let wall = rng.gen_bool(p);
            wall && !keep.contains(i)
        })
        .collect()
}

/// Text picture of a grid search: `#` wall, `.` settled, `*` path, `S`/`G`
/// endpoints, space otherwise.
pub fn ascii_grid(width: usize, height: usize, walls: &[usize], settled: &[usize], path: &[usize]) -> String {
    let mut cells = vec![' '; width * height];
    for &i in walls {
        if let Some(c) = cells.get_mut(i) {
            *c = '#';
        }
    }
    for &i in settled {
        if let Some(c) = cells.get_mut(i) {
            *c = '.';
        }
    }
    for &i in path {
        if let Some(c) = cells.get_mut(i) {
            *c = '*';
        }
    }
    if let (Some(&first), Some(&last)) = (path.first(), path.last()) {
        cells[first] = 'S';
        cells[last] = 'G';
    }
    let mut out = String::with_capacity((width + 3) * (height + 2));
    let border: String = std::iter::repeat('-').take(width).collect();
    out.push('+');
    out.push_str(&border);
    out.push_str("+\n");
    for row in cells.chunks(width.max(1)) {
        out.push('|');
        out.extend(row.iter());
        out.push_str("|\n");
    }
    out.push('+');
    out.push_str(&border);
    out.push('+');
    out
}
