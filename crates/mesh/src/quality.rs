//! Triangle quality statistics

// standard library
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

// crate modules
use crate::error::Result;
use crate::mesh2d::Mesh2D;

// slftools modules
use slftools_format::NumFormat;
use slftools_utils::{Histogram, SliceExt};

// external crates
use serde::Serialize;

/// Summary of edge lengths, angles, and areas over every triangle
///
/// Angles come from the law of cosines and areas from Heron's formula, both
/// on the edge lengths. Each triangle contributes its smallest interior angle
/// to the `angles` histogram (1 degree bins up to 10) and its longest to
/// shortest edge ratio to the `ratios` histogram (unit bins from 1 to 10).
/// Anything larger lands in the overflow count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshStatistics {
    /// Number of triangles
    pub triangles: usize,
    /// Smallest interior angle (degrees)
    pub min_angle: f64,
    /// Largest interior angle (degrees)
    pub max_angle: f64,
    /// Shortest edge
    pub min_edge: f64,
    /// Longest edge
    pub max_edge: f64,
    /// Smallest triangle area
    pub min_area: f64,
    /// Largest triangle area
    pub max_area: f64,
    /// Sum of triangle areas
    pub total_area: f64,
    /// Smallest interior angle of each triangle, binned
    pub angles: Histogram,
    /// Edge length ratio of each triangle, binned
    pub ratios: Histogram,
}

/// Edge lengths, angles, and area of one triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleQuality {
    /// Lengths of the edges opposite each corner
    pub edges: [f64; 3],
    /// Interior angles at each corner (degrees)
    pub angles: [f64; 3],
    /// Area from Heron's formula
    pub area: f64,
}

impl TriangleQuality {
    /// Measure a triangle of the mesh
    pub fn new(mesh: &Mesh2D, element: usize) -> Self {
        let [a, b, c] = mesh.vertices(element);
        let edges = [(c - b).norm(), (a - c).norm(), (b - a).norm()];

        Self {
            edges,
            angles: interior_angles(edges),
            area: heron(edges),
        }
    }

    /// Longest over shortest edge, infinite for a collapsed edge
    pub fn ratio(&self) -> f64 {
        let shortest = self.edges.iter().copied().fold(f64::INFINITY, f64::min);
        let longest = self.edges.iter().copied().fold(0.0, f64::max);
        if shortest > 0.0 {
            longest / shortest
        } else {
            f64::INFINITY
        }
    }
}

/// Law of cosines, collapsed triangles get zero angles
fn interior_angles([a, b, c]: [f64; 3]) -> [f64; 3] {
    if a <= 0.0 || b <= 0.0 || c <= 0.0 {
        return [0.0; 3];
    }
    let angle = |opposite: f64, p: f64, q: f64| {
        ((p * p + q * q - opposite * opposite) / (2.0 * p * q))
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees()
    };
    [angle(a, b, c), angle(b, c, a), angle(c, a, b)]
}

/// Heron's formula, clamped at zero for rounding on flat triangles
fn heron([a, b, c]: [f64; 3]) -> f64 {
    let s = 0.5 * (a + b + c);
    (s * (s - a) * (s - b) * (s - c)).max(0.0).sqrt()
}

impl MeshStatistics {
    /// Measure every triangle of the mesh
    pub fn from_mesh(mesh: &Mesh2D) -> Result<Self> {
        let quality = (0..mesh.nelem())
            .map(|e| TriangleQuality::new(mesh, e))
            .collect::<Vec<TriangleQuality>>();

        let edges: Vec<f64> = quality.iter().flat_map(|q| q.edges).collect();
        let angles: Vec<f64> = quality.iter().flat_map(|q| q.angles).collect();
        let areas: Vec<f64> = quality.iter().map(|q| q.area).collect();

        let mut angle_histogram = Histogram::uniform(0.0, 10.0, 10)?;
        let mut ratio_histogram = Histogram::uniform(1.0, 10.0, 9)?;
        for q in &quality {
            angle_histogram.add(q.angles.iter().copied().fold(f64::INFINITY, f64::min));

            // collapsed edges count as the worst ratio
            match q.ratio() {
                r if r.is_finite() => ratio_histogram.add(r),
                _ => ratio_histogram.overflow += 1,
            }
        }

        Ok(Self {
            triangles: quality.len(),
            min_angle: angles.try_min()?,
            max_angle: angles.try_max()?,
            min_edge: edges.try_min()?,
            max_edge: edges.try_max()?,
            min_area: areas.try_min()?,
            max_area: areas.try_max()?,
            total_area: areas.iter().sum(),
            angles: angle_histogram,
            ratios: ratio_histogram,
        })
    }
}

/// Write the statistics to a JSON file
///
/// ```rust, no_run
/// # use slftools_mesh::{write_json, Mesh2D};
/// # use slftools_serafin::SerafinFile;
/// let slf = SerafinFile::open("results.slf").unwrap();
/// let mesh = Mesh2D::from_file(&slf).unwrap();
///
/// write_json(&mesh.statistics().unwrap(), "./quality.json").unwrap();
/// ```
pub fn write_json<P: AsRef<Path>>(statistics: &MeshStatistics, path: P) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, statistics)?;
    Ok(())
}

impl std::fmt::Display for MeshStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Mesh statistics for {} triangles", self.triangles)?;
        writeln!(f, "  angle : {} to {}", self.min_angle.sci(4, 2), self.max_angle.sci(4, 2))?;
        writeln!(f, "  edge  : {} to {}", self.min_edge.sci(4, 2), self.max_edge.sci(4, 2))?;
        writeln!(f, "  area  : {} to {}", self.min_area.sci(4, 2), self.max_area.sci(4, 2))?;
        writeln!(f, "  total : {}", self.total_area.sci(4, 2))?;

        writeln!(f, "\n  smallest angle (degrees)")?;
        for (i, count) in self.angles.counts.iter().enumerate() {
            writeln!(f, "  {:>3} - {:<3} {count:>10}", i, i + 1)?;
        }
        writeln!(f, "      > 10 {:>10}", self.angles.overflow)?;

        writeln!(f, "\n  edge ratio")?;
        for (i, count) in self.ratios.counts.iter().enumerate() {
            writeln!(f, "  {:>3} - {:<3} {count:>10}", i + 1, i + 2)?;
        }
        write!(f, "      > 10 {:>10}", self.ratios.overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_triangle() {
        let mesh = Mesh2D::new(
            vec![0.0, 3.0, 0.0],
            vec![0.0, 0.0, 4.0],
            vec![[0, 1, 2]],
            vec![0; 3],
        );

        let q = TriangleQuality::new(&mesh, 0);
        assert_eq!(q.edges, [5.0, 4.0, 3.0]);
        assert!((q.angles[0] - 90.0).abs() < 1e-9);
        assert!((q.angles.iter().sum::<f64>() - 180.0).abs() < 1e-9);
        assert!((q.area - 6.0).abs() < 1e-12);
        assert!((q.ratio() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn histograms_and_overflow() {
        // one equilateral triangle and one sliver
        let h = 3.0_f64.sqrt() / 2.0;
        let mesh = Mesh2D::new(
            vec![0.0, 1.0, 0.5, 10.0, 30.0, 15.0],
            vec![0.0, 0.0, h, 0.0, 0.0, 0.5],
            vec![[0, 1, 2], [3, 4, 5]],
            vec![0; 6],
        );

        let stats = mesh.statistics().unwrap();
        assert_eq!(stats.triangles, 2);
        assert!((stats.max_angle - 180.0).abs() > 1.0);
        assert!(stats.min_angle < 3.0);

        // sliver just under 2 degrees, equilateral above 10
        assert_eq!(stats.angles.total(), 2);
        assert_eq!(stats.angles.counts[1], 1);
        assert_eq!(stats.angles.overflow, 1);

        // equilateral has a ratio of 1, the sliver just under 4
        assert_eq!(stats.ratios.counts[0], 1);
        assert_eq!(stats.ratios.counts[2], 1);
        assert!((stats.total_area - (h / 2.0 + 5.0)).abs() < 1e-9);
    }

    #[test]
    fn statistics_to_json() {
        let mesh = Mesh2D::new(
            vec![0.0, 3.0, 0.0],
            vec![0.0, 0.0, 4.0],
            vec![[0, 1, 2]],
            vec![0; 3],
        );
        let stats = mesh.statistics().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quality.json");
        write_json(&stats, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["triangles"], 1);
        assert_eq!(json["total_area"], 6.0);
        assert_eq!(json["angles"]["overflow"], 1);

        let missing = dir.path().join("missing").join("quality.json");
        assert!(matches!(
            write_json(&stats, missing),
            Err(crate::error::Error::IOError(_))
        ));
    }

    #[test]
    fn empty_mesh_has_no_statistics() {
        assert!(Mesh2D::default().statistics().is_err());
    }
}
