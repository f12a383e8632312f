//! Interpolation of node values at arbitrary points

// crate modules
use crate::error::{Error, Result};
use crate::locate::barycentric_weights;
use crate::mesh2d::Mesh2D;

// slftools modules
use slftools_serafin::{SerafinFile, TimeSelector, VariableSelector};

// external crates
use itertools::Itertools;
use log::{debug, warn};

/// Names tried, in order, for the node elevation of 3D results
pub const ELEVATION_NAMES: [&str; 2] = ["ELEVATION Z", "COTE Z"];

/// Triangle and weights interpolating one point
#[derive(Debug, Clone, Copy, PartialEq)]
struct Stencil {
    triangle: usize,
    weights: [f64; 3],
}

/// Precomputed linear interpolation at a fixed set of points
///
/// Only the triangles holding a point are kept, renumbered over the few
/// nodes they use, so repeated extraction only reads those nodes.
///
/// ```rust, no_run
/// # use slftools_mesh::{Mesh2D, Probe};
/// # use slftools_serafin::SerafinFile;
/// let mut slf = SerafinFile::open("results.slf").unwrap();
/// let mesh = Mesh2D::from_file(&slf).unwrap();
///
/// let probe = Probe::prepare(&mesh, &[[100.0, 250.0], [140.0, 260.0]]);
/// let depth = probe.values(&mut slf, 3600.0, &["WATER DEPTH".into()]).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    /// Query points
    pub points: Vec<[f64; 2]>,
    /// Triangle of the 2D mesh holding each point
    pub elements: Vec<Option<usize>>,
    /// Sorted 2D mesh nodes needed for the interpolation
    pub nodes: Vec<usize>,
    /// Triangles holding any point, as indices into `nodes`
    pub triangles: Vec<[usize; 3]>,
    stencils: Vec<Option<Stencil>>,
    npoin: usize,
}

impl Probe {
    /// Locate the points and build the local triangulation
    pub fn prepare(mesh: &Mesh2D, points: &[[f64; 2]]) -> Self {
        let elements = mesh.locate(points);

        let unique = elements
            .iter()
            .flatten()
            .copied()
            .sorted_unstable()
            .dedup()
            .collect::<Vec<usize>>();

        let nodes = unique
            .iter()
            .flat_map(|e| mesh.triangles[*e])
            .sorted_unstable()
            .dedup()
            .collect::<Vec<usize>>();

        let triangles = unique
            .iter()
            .map(|e| mesh.triangles[*e].map(|n| nodes.partition_point(|m| *m < n)))
            .collect();

        let stencils = points
            .iter()
            .zip(&elements)
            .map(|(point, element)| {
                let e = (*element)?;
                Some(Stencil {
                    triangle: unique.partition_point(|u| *u < e),
                    weights: barycentric_weights(mesh, e, *point)?,
                })
            })
            .collect::<Vec<Option<Stencil>>>();

        let outside = stencils.iter().filter(|s| s.is_none()).count();
        if outside > 0 {
            warn!("{outside} of {} probe points are outside the mesh", points.len());
        }
        debug!(
            "Probe of {} points over {} triangles and {} nodes",
            points.len(),
            unique.len(),
            nodes.len()
        );

        Self {
            points: points.to_vec(),
            elements,
            nodes,
            triangles,
            stencils,
            npoin: mesh.npoin(),
        }
    }

    /// Interpolate at every point from values at [nodes](Probe::nodes)
    ///
    /// Points outside the mesh give `None`.
    pub fn interpolate(&self, values: &[f64]) -> Result<Vec<Option<f64>>> {
        if values.len() != self.nodes.len() {
            return Err(Error::UnexpectedNumberOfValues {
                expected: self.nodes.len(),
                found: values.len(),
            });
        }
        Ok((0..self.points.len())
            .map(|p| self.interpolate_point(p, values))
            .collect())
    }

    fn interpolate_point(&self, point: usize, values: &[f64]) -> Option<f64> {
        let stencil = self.stencils[point]?;
        let triangle = self.triangles[stencil.triangle];
        Some(
            stencil
                .weights
                .iter()
                .zip(triangle)
                .map(|(w, n)| w * values[n])
                .sum(),
        )
    }

    /// Interpolated variables at one time step, as `[variable][point]`
    ///
    /// For 3D results this is the bottom plane, see
    /// [values_at_elevations()](Probe::values_at_elevations) for the rest.
    pub fn values<T: Into<TimeSelector>>(
        &self,
        file: &mut SerafinFile,
        time: T,
        variables: &[VariableSelector],
    ) -> Result<Vec<Vec<Option<f64>>>> {
        let ids = resolve(file, variables)?;
        let data = file.read_nodes(time, &self.nodes)?;
        ids.iter().map(|v| self.interpolate(&data[*v])).collect()
    }

    /// Interpolated history of one variable through every time step
    ///
    /// Each entry is the time stamp and the value at every point.
    pub fn series(
        &self,
        file: &SerafinFile,
        variable: &VariableSelector,
    ) -> Result<Vec<(f64, Vec<Option<f64>>)>> {
        let v = file.header().position(variable)?;
        file.node_series(&self.nodes)?
            .map(|step| -> Result<(f64, Vec<Option<f64>>)> {
                let (time, data) = step?;
                Ok((time, self.interpolate(&data[v])?))
            })
            .collect()
    }

    /// Variables of a 3D result interpolated to fixed elevations
    ///
    /// Each point is interpolated on every plane, then linearly between the
    /// two planes bracketing each target elevation. Targets below the bottom
    /// or above the top plane give `None`.
    ///
    /// Values come back as `[variable][point][elevation]`.
    pub fn values_at_elevations<T: Into<TimeSelector>>(
        &self,
        file: &mut SerafinFile,
        time: T,
        variables: &[VariableSelector],
        elevations: &[f64],
    ) -> Result<Vec<Vec<Vec<Option<f64>>>>> {
        let ids = resolve(file, variables)?;
        let z = file
            .header()
            .first_of(&ELEVATION_NAMES)
            .ok_or_else(|| Error::MissingVariable(ELEVATION_NAMES.map(String::from).to_vec()))?;

        let nplan = file.header().nplan();
        let nodes = (0..nplan)
            .flat_map(|p| self.nodes.iter().map(move |n| n + p * self.npoin))
            .collect::<Vec<usize>>();
        let data = file.read_nodes(time, &nodes)?;

        // [point][plane] for one variable
        let k = self.nodes.len();
        let by_plane = |v: usize| -> Vec<Vec<Option<f64>>> {
            let planes = (0..nplan)
                .map(|p| {
                    let values = &data[v][p * k..(p + 1) * k];
                    (0..self.points.len())
                        .map(|point| self.interpolate_point(point, values))
                        .collect::<Vec<Option<f64>>>()
                })
                .collect::<Vec<_>>();
            (0..self.points.len())
                .map(|point| planes.iter().map(|plane| plane[point]).collect())
                .collect()
        };

        let depth = by_plane(z);
        Ok(ids
            .iter()
            .map(|v| {
                by_plane(*v)
                    .iter()
                    .zip(&depth)
                    .map(|(values, z)| {
                        let values = values.iter().copied().collect::<Option<Vec<f64>>>();
                        let z = z.iter().copied().collect::<Option<Vec<f64>>>();
                        elevations
                            .iter()
                            .map(|target| vertical(z.as_deref()?, values.as_deref()?, *target))
                            .collect::<Vec<Option<f64>>>()
                    })
                    .collect::<Vec<Vec<Option<f64>>>>()
            })
            .collect())
    }
}

fn resolve(file: &SerafinFile, variables: &[VariableSelector]) -> Result<Vec<usize>> {
    variables
        .iter()
        .map(|v| Ok(file.header().position(v)?))
        .collect()
}

/// Linear interpolation between the planes bracketing a target elevation
///
/// Elevations run from the bottom plane up.
fn vertical(z: &[f64], values: &[f64], target: f64) -> Option<f64> {
    z.windows(2).enumerate().find_map(|(i, pair)| {
        let (lower, upper) = (pair[0], pair[1]);
        if target < lower || target > upper {
            return None;
        }
        if upper == lower {
            return Some(values[i]);
        }
        let t = (target - lower) / (upper - lower);
        Some(values[i] + t * (values[i + 1] - values[i]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Mesh2D {
        Mesh2D::new(
            vec![0.0, 1.0, 1.0, 0.0, 5.0],
            vec![0.0, 0.0, 1.0, 1.0, 5.0],
            vec![[0, 1, 2], [0, 2, 3]],
            vec![0; 5],
        )
    }

    #[test]
    fn local_triangulation() {
        let probe = Probe::prepare(&square(), &[[0.9, 0.1], [0.8, 0.2], [3.0, 3.0]]);
        assert_eq!(probe.elements, vec![Some(0), Some(0), None]);
        assert_eq!(probe.nodes, vec![0, 1, 2]);
        assert_eq!(probe.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn linear_fields_are_exact() {
        let mesh = square();
        let points = [[0.25, 0.5], [0.75, 0.5], [1.0, 1.0]];
        let probe = Probe::prepare(&mesh, &points);

        // f(x, y) = 2x + 3y + 1 at the probe nodes
        let values = probe
            .nodes
            .iter()
            .map(|n| 2.0 * mesh.x[*n] + 3.0 * mesh.y[*n] + 1.0)
            .collect::<Vec<f64>>();

        let result = probe.interpolate(&values).unwrap();
        for (point, value) in points.iter().zip(result) {
            let expected = 2.0 * point[0] + 3.0 * point[1] + 1.0;
            assert!((value.unwrap() - expected).abs() < 1e-12);
        }
        assert!(probe.interpolate(&[1.0]).is_err());
    }

    #[test]
    fn vertical_interpolation() {
        let z = [-10.0, -4.0, 0.0];
        let values = [1.0, 4.0, 6.0];
        assert_eq!(vertical(&z, &values, -7.0), Some(2.5));
        assert_eq!(vertical(&z, &values, 0.0), Some(6.0));
        assert_eq!(vertical(&z, &values, -12.0), None);
        assert_eq!(vertical(&z, &values, 1.0), None);
    }
}
