//! Closed boundary rings of a 2D mesh

// standard library
use std::collections::{HashMap, HashSet};

// crate modules
use crate::mesh2d::{edge, shoelace, Edge, Mesh2D};

// external crates
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

/// Boundary rings classified by winding
///
/// Rings run with the domain on their left, so outer boundaries are
/// counter-clockwise and islands (holes) are clockwise. Rings are open
/// sequences of node indices, the closing edge back to the first node is
/// implied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Boundaries {
    /// Counter-clockwise rings
    pub outer: Vec<Vec<usize>>,
    /// Clockwise rings
    pub islands: Vec<Vec<usize>>,
}

impl Boundaries {
    /// Total number of rings
    pub fn len(&self) -> usize {
        self.outer.len() + self.islands.len()
    }

    /// True if no ring was found
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every ring, outer boundaries first
    pub fn rings(&self) -> impl Iterator<Item = &Vec<usize>> {
        self.outer.iter().chain(self.islands.iter())
    }

    /// True if the node is on any ring
    pub fn contains(&self, node: usize) -> bool {
        self.rings().any(|ring| ring.contains(&node))
    }
}

/// True if the ring of nodes winds counter-clockwise
pub fn is_ccw(mesh: &Mesh2D, ring: &[usize]) -> bool {
    let points = ring.iter().map(|n| mesh.point(*n)).collect::<Vec<_>>();
    shoelace(&points) > 0.0
}

/// Find and classify every boundary ring
///
/// Rings come from the boundary table when it has any positive entry, and
/// are otherwise chained from the edges that belong to a single triangle.
pub(crate) fn find_boundaries(mesh: &Mesh2D) -> Boundaries {
    let rings = if mesh.ipobo.iter().any(|i| *i > 0) {
        rings_from_table(mesh)
    } else {
        warn!("Boundary table is empty, chaining rings from boundary edges");
        rings_from_edges(mesh)
    };

    let (outer, islands): (Vec<Vec<usize>>, Vec<Vec<usize>>) =
        rings.into_iter().partition(|ring| is_ccw(mesh, ring));

    debug!(
        "Found {} outer boundaries and {} islands",
        outer.len(),
        islands.len()
    );
    Boundaries { outer, islands }
}

/// Walk boundary nodes in table order, closing a ring once the current node
/// shares a boundary edge with the first
fn rings_from_table(mesh: &Mesh2D) -> Vec<Vec<usize>> {
    let boundary_edges: HashSet<Edge> = mesh.boundary_edges().into_iter().collect();

    let order = (0..mesh.npoin())
        .filter(|n| mesh.ipobo[*n] > 0)
        .sorted_by_key(|n| mesh.ipobo[*n]);

    let mut rings = Vec::new();
    let mut ring: Vec<usize> = Vec::new();
    for node in order {
        ring.push(node);
        if ring.len() >= 3 && boundary_edges.contains(&edge(node, ring[0])) {
            rings.push(std::mem::take(&mut ring));
        }
    }

    if !ring.is_empty() {
        warn!("{} boundary nodes do not close a ring", ring.len());
    }
    rings
}

/// Chain boundary edges into rings with the domain on the left
fn rings_from_edges(mesh: &Mesh2D) -> Vec<Vec<usize>> {
    let mut next: HashMap<usize, usize> = HashMap::new();

    for (&(a, b), elements) in mesh.edge_to_elements() {
        if elements.len() != 1 {
            continue;
        }

        // direction of the edge within its triangle
        let e = elements[0];
        let triangle = mesh.triangles[e];
        let forward = (0..3).any(|i| triangle[i] == a && triangle[(i + 1) % 3] == b);
        let ccw = mesh.signed_area(e) > 0.0;

        let (from, to) = if forward == ccw { (a, b) } else { (b, a) };
        if next.insert(from, to).is_some() {
            warn!("Node {from} starts more than one boundary edge");
        }
    }

    let mut visited = HashSet::new();
    let mut rings = Vec::new();
    for start in next.keys().copied().sorted_unstable() {
        if !visited.insert(start) {
            continue;
        }

        let mut ring = vec![start];
        let mut current = next[&start];
        while current != start {
            if !visited.insert(current) {
                warn!("Boundary ring from node {start} crosses another ring");
                break;
            }
            ring.push(current);
            current = match next.get(&current) {
                Some(n) => *n,
                None => {
                    warn!("Boundary ring from node {start} is not closed");
                    break;
                }
            };
        }
        rings.push(ring);
    }
    rings
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 node grid, optionally without the two triangles of the centre cell
    fn grid(with_hole: bool) -> Mesh2D {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                x.push(i as f64);
                y.push(j as f64);
            }
        }

        let mut triangles = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                if with_hole && i == 1 && j == 1 {
                    continue;
                }
                let n = j * 4 + i;
                triangles.push([n, n + 1, n + 5]);
                triangles.push([n, n + 5, n + 4]);
            }
        }

        Mesh2D::new(x, y, triangles, vec![0; 16])
    }

    #[test]
    fn chained_outer_ring() {
        let mesh = grid(false);
        let boundaries = mesh.boundaries();
        assert_eq!(boundaries.outer.len(), 1);
        assert!(boundaries.islands.is_empty());
        assert_eq!(boundaries.outer[0].len(), 12);
    }

    #[test]
    fn chained_island() {
        let mesh = grid(true);
        let boundaries = mesh.boundaries();
        assert_eq!(boundaries.outer.len(), 1);
        assert_eq!(boundaries.islands.len(), 1);

        let mut hole = boundaries.islands[0].clone();
        hole.sort();
        assert_eq!(hole, vec![5, 6, 9, 10]);
        assert!(!is_ccw(&mesh, &boundaries.islands[0]));
    }

    #[test]
    fn table_rings_follow_numbering() {
        let mut mesh = grid(true);

        // number the rings found from edges, outer first
        let chained = find_boundaries(&mesh);
        let mut ipobo = vec![0; 16];
        for (i, node) in chained.rings().flatten().enumerate() {
            ipobo[*node] = i as i32 + 1;
        }
        mesh.ipobo = ipobo;

        let from_table = find_boundaries(&mesh);
        assert_eq!(from_table, chained);
    }
}
