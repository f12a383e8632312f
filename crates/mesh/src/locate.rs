//! Point location in a triangular mesh

// standard library
use std::collections::HashSet;

// crate modules
use crate::error::{Error, Result};
use crate::mesh2d::Mesh2D;

// slftools modules
use slftools_format::f;

// external crates
use log::{debug, warn};
use nalgebra::{Matrix2, Point2};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

/// Bounding box of a triangle tagged with its index
type TriangleEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Node coordinates tagged with the node index
type IndexedNode = GeomWithData<[f64; 2], usize>;

/// Nearest nodes searched by the fallback
const CANDIDATE_NODES: usize = 10;

/// Tolerance on barycentric coordinates so points on edges are inside
const TOLERANCE: f64 = 1e-10;

/// Spatial index used by [Mesh2D::locate()]
///
/// The triangle index holds the bounding box of every triangle and tests the
/// few candidates overlapping a point. Meshes with repeated coordinates or
/// flat triangles can not be indexed that way, and fall back to testing the
/// triangles around the nearest nodes.
#[derive(Debug)]
pub(crate) enum Locator {
    /// R-tree of triangle bounding boxes
    Triangles(RTree<TriangleEnvelope>),
    /// R-tree of node coordinates
    Nodes(RTree<IndexedNode>),
}

impl Locator {
    pub(crate) fn new(mesh: &Mesh2D) -> Self {
        match triangle_tree(mesh) {
            Ok(tree) => {
                debug!("Triangle index built for {} triangles", mesh.nelem());
                Self::Triangles(tree)
            }
            Err(e) => {
                warn!("{e}, falling back to nearest node search");
                Self::Nodes(node_tree(mesh))
            }
        }
    }

    /// Lowest index triangle containing the point
    pub(crate) fn locate(&self, mesh: &Mesh2D, point: [f64; 2]) -> Option<usize> {
        match self {
            Self::Triangles(tree) => tree
                .locate_all_at_point(&point)
                .map(|envelope| envelope.data)
                .filter(|e| contains(mesh, *e, point))
                .min(),
            Self::Nodes(tree) => tree
                .nearest_neighbor_iter(&point)
                .take(CANDIDATE_NODES)
                .flat_map(|node| mesh.incidence()[node.data].iter().copied())
                .filter(|e| contains(mesh, *e, point))
                .min(),
        }
    }
}

/// Index of triangle bounding boxes, refused for degenerate meshes
fn triangle_tree(mesh: &Mesh2D) -> Result<RTree<TriangleEnvelope>> {
    let mut seen = HashSet::with_capacity(mesh.npoin());
    for n in 0..mesh.npoin() {
        if !seen.insert((mesh.x[n].to_bits(), mesh.y[n].to_bits())) {
            return Err(Error::DegenerateTriangulation(f!(
                "node {n} repeats the coordinates ({}, {})",
                mesh.x[n],
                mesh.y[n]
            )));
        }
    }

    let envelopes = (0..mesh.nelem())
        .map(|e| {
            if mesh.signed_area(e) == 0.0 {
                return Err(Error::DegenerateTriangulation(f!("triangle {e} has no area")));
            }

            let [a, b, c] = mesh.vertices(e);
            let lower = [a.x.min(b.x).min(c.x), a.y.min(b.y).min(c.y)];
            let upper = [a.x.max(b.x).max(c.x), a.y.max(b.y).max(c.y)];
            Ok(GeomWithData::new(Rectangle::from_corners(lower, upper), e))
        })
        .collect::<Result<Vec<TriangleEnvelope>>>()?;

    Ok(RTree::bulk_load(envelopes))
}

/// Index of node coordinates
fn node_tree(mesh: &Mesh2D) -> RTree<IndexedNode> {
    let nodes = (0..mesh.npoin())
        .map(|n| GeomWithData::new([mesh.x[n], mesh.y[n]], n))
        .collect();
    RTree::bulk_load(nodes)
}

/// Barycentric weights of a point for the three corners of a triangle
///
/// The weights sum to one and are all non-negative inside the triangle.
/// Returns `None` for a triangle with no area.
pub fn barycentric_weights(mesh: &Mesh2D, element: usize, point: [f64; 2]) -> Option<[f64; 3]> {
    let [a, b, c] = mesh.vertices(element);
    let inverse = Matrix2::from_columns(&[b - a, c - a]).try_inverse()?;
    let uv = inverse * (Point2::from(point) - a);
    Some([1.0 - uv.x - uv.y, uv.x, uv.y])
}

/// Inclusive point in triangle test
fn contains(mesh: &Mesh2D, element: usize, point: [f64; 2]) -> bool {
    barycentric_weights(mesh, element, point)
        .is_some_and(|weights| weights.iter().all(|w| *w >= -TOLERANCE))
}
