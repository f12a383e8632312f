//! Integration tests for mesh topology derived from Serafin files

use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};
use slftools_mesh::vtk::{write_vtk, FrameToVtk, VtkFormat};
use slftools_mesh::{edge, is_ccw, Mesh2D, Probe};
use slftools_serafin::{Encoding, Header, SerafinFile, SerafinWriter, Variable, VariableSelector};
use tempfile::TempDir;

/// Nodes of an `n * n` grid with unit spacing, row by row
fn grid_nodes(n: usize) -> (Vec<f64>, Vec<f64>) {
    (0..n * n)
        .map(|i| ((i % n) as f64, (i / n) as f64))
        .unzip()
}

/// 1-based triangles of an `n * n` node grid, skipping any listed cell
fn grid_triangles(n: usize, skip: &[(usize, usize)]) -> Vec<[i32; 3]> {
    let mut triangles = Vec::new();
    for j in 0..n - 1 {
        for i in 0..n - 1 {
            if skip.contains(&(i, j)) {
                continue;
            }
            let a = (j * n + i + 1) as i32;
            let b = a + n as i32;
            triangles.push([a, a + 1, b + 1]);
            triangles.push([a, b + 1, b]);
        }
    }
    triangles
}

fn write(path: &Path, header: &Header, frames: &[Vec<Vec<f64>>]) -> PathBuf {
    let mut writer = SerafinWriter::create(path, header, Encoding::default()).unwrap();
    for (t, values) in frames.iter().enumerate() {
        writer.write_frame(t as f64, values).unwrap();
    }
    writer.finish().unwrap();
    path.to_path_buf()
}

struct Prisms {
    _dir: TempDir,
    path: PathBuf,
}

/// Two planes of a 10 x 10 grid at z = -5 and z = 0, with "VELOCITY U" = x + z
#[fixture]
fn prisms() -> Prisms {
    let dir = tempfile::tempdir().unwrap();
    let (x2, y2) = grid_nodes(10);

    let x = [x2.clone(), x2].concat();
    let y = [y2.clone(), y2].concat();
    let z = (0..200)
        .map(|n| if n < 100 { -5.0 } else { 0.0 })
        .collect::<Vec<f64>>();
    let u = x.iter().zip(&z).map(|(x, z)| x + z).collect::<Vec<f64>>();

    let ikle = grid_triangles(10, &[])
        .iter()
        .flat_map(|[a, b, c]| [*a, *b, *c, a + 100, b + 100, c + 100])
        .collect::<Vec<i32>>();

    let header = Header::new(
        "PRISMS",
        vec![Variable::new("ELEVATION Z", "M"), Variable::new("VELOCITY U", "M/S")],
    )
    .with_mesh(x, y, ikle, 6, vec![0; 200])
    .with_planes(2);

    let path = write(&dir.path().join("prisms.slf"), &header, &[vec![z, u]]);
    Prisms { _dir: dir, path }
}

/// 4 x 4 grid with the centre cell removed, boundary table numbered
/// counter-clockwise around the outside and clockwise around the hole
fn holed_header() -> Header {
    let (x, y) = grid_nodes(4);
    let ikle = grid_triangles(4, &[(1, 1)]).concat();

    let mut ipobo = vec![0; 16];
    let rings = [0, 1, 2, 3, 7, 11, 15, 14, 13, 12, 8, 4, 5, 9, 10, 6];
    for (i, node) in rings.iter().enumerate() {
        ipobo[*node] = i as i32 + 1;
    }

    Header::new("HOLE", vec![Variable::new("WATER DEPTH", "M")]).with_mesh(x, y, ikle, 3, ipobo)
}

#[rstest]
fn two_plane_projection(prisms: Prisms) {
    let mut slf = SerafinFile::open(&prisms.path).unwrap();
    assert_eq!(slf.header().nplan(), 2);
    assert_eq!(slf.header().npoin, 200);

    let z = slf
        .read_variable(0usize, &"ELEVATION Z".into())
        .unwrap();
    assert_eq!(z.len(), 200);

    let mesh = Mesh2D::from_file(&slf).unwrap();
    assert_eq!(mesh.npoin(), 100);
    assert_eq!(mesh.nelem(), 162);
    assert_eq!(mesh.nplan, 2);

    let area = mesh.node_area();
    assert_eq!(area.len(), 100);
    assert!(area.iter().all(|a| *a > 0.0));
    assert!((area.iter().sum::<f64>() - 81.0).abs() < 81.0e-6);
}

#[rstest]
fn vertical_probe(prisms: Prisms) {
    let mut slf = SerafinFile::open(&prisms.path).unwrap();
    let mesh = Mesh2D::from_file(&slf).unwrap();

    let probe = Probe::prepare(&mesh, &[[4.5, 4.25], [20.0, 20.0]]);
    let u: VariableSelector = "VELOCITY U".into();

    let values = probe
        .values_at_elevations(&mut slf, 0usize, &[u.clone()], &[-2.5, 0.0, 1.0])
        .unwrap();
    let point = &values[0][0];
    assert!((point[0].unwrap() - 2.0).abs() < 1e-9);
    assert!((point[1].unwrap() - 4.5).abs() < 1e-9);
    assert_eq!(point[2], None);
    assert!(values[0][1].iter().all(Option::is_none));

    // bottom plane only
    let bottom = probe.values(&mut slf, 0usize, &[u]).unwrap();
    assert!((bottom[0][0].unwrap() + 0.5).abs() < 1e-9);
}

#[rstest]
fn prisms_to_vtk(prisms: Prisms) {
    let mut slf = SerafinFile::open(&prisms.path).unwrap();
    let frame = slf.read(0usize, &[]).unwrap();

    let vtk = FrameToVtk::builder()
        .variables(vec![1])
        .build()
        .convert(slf.header(), &frame)
        .unwrap();

    let output = prisms.path.with_extension("vtk");
    write_vtk(vtk, &output, VtkFormat::LegacyAscii).unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("VELOCITY U"));
    assert!(!text.contains("ELEVATION Z"));
}

#[test]
fn boundary_table_classification() {
    let dir = tempfile::tempdir().unwrap();
    let header = holed_header();
    let path = write(&dir.path().join("hole.slf"), &header, &[vec![vec![1.0; 16]]]);

    let slf = SerafinFile::open(path).unwrap();
    let mesh = Mesh2D::from_file(&slf).unwrap();
    let boundaries = mesh.boundaries();

    assert_eq!(boundaries.outer, vec![vec![0, 1, 2, 3, 7, 11, 15, 14, 13, 12, 8, 4]]);
    assert_eq!(boundaries.islands, vec![vec![5, 9, 10, 6]]);
    assert!(is_ccw(&mesh, &boundaries.outer[0]));
    assert!(!is_ccw(&mesh, &boundaries.islands[0]));
}

#[test]
fn edge_chaining_matches_boundary_table() {
    let header = holed_header();
    let with_table = Mesh2D::from_header(&header).unwrap();

    let mut without = header.clone();
    without.ipobo = vec![0; 16];
    let without = Mesh2D::from_header(&without).unwrap();

    assert_eq!(without.boundaries(), with_table.boundaries());
}

#[test]
fn topology_invariants() {
    let header = holed_header();
    let mesh = Mesh2D::from_header(&header).unwrap();

    // interior edges are shared by two triangles, boundary edges by one
    let edges = mesh.edge_to_elements();
    assert!(edges.values().all(|e| e.len() == 1 || e.len() == 2));
    assert_eq!(mesh.boundary_edges().len(), 16);

    // every node is on a ring, or closed in by its triangles
    let boundaries = mesh.boundaries();
    for node in 0..mesh.npoin() {
        if boundaries.contains(node) {
            continue;
        }
        for neighbor in &mesh.neighbors()[node] {
            assert_eq!(edges[&edge(node, *neighbor)].len(), 2);
        }
    }

    assert!((mesh.node_area().iter().sum::<f64>() - mesh.total_area()).abs() < 1e-12);
    assert_eq!(mesh.total_area(), 8.0);
}

#[test]
fn locate_nodes_and_outside_points() {
    let (x, y) = grid_nodes(5);
    let ikle = grid_triangles(5, &[]).concat();
    let header = Header::new("GRID", vec![]).with_mesh(x, y, ikle, 3, vec![0; 25]);
    let mesh = Mesh2D::from_header(&header).unwrap();

    let nodes = (0..25)
        .map(|n| [mesh.x[n], mesh.y[n]])
        .collect::<Vec<[f64; 2]>>();
    for (n, element) in mesh.locate(&nodes).into_iter().enumerate() {
        let e = element.unwrap();
        assert!(mesh.triangles[e].contains(&n));
    }

    assert_eq!(mesh.locate(&[[-1.0, 2.0], [2.0, 4.5]]), vec![None, None]);
    assert_eq!(mesh.locate(&[[0.75, 0.25]]), vec![Some(0)]);
}

#[test]
fn quality_of_a_regular_grid() {
    let (x, y) = grid_nodes(3);
    let ikle = grid_triangles(3, &[]).concat();
    let header = Header::new("GRID", vec![]).with_mesh(x, y, ikle, 3, vec![0; 9]);
    let stats = Mesh2D::from_header(&header).unwrap().statistics().unwrap();

    assert_eq!(stats.triangles, 8);
    assert!((stats.min_angle - 45.0).abs() < 1e-9);
    assert!((stats.max_angle - 90.0).abs() < 1e-9);
    assert!((stats.total_area - 4.0).abs() < 1e-12);
    assert_eq!(stats.angles.overflow, 8);
    assert_eq!(stats.ratios.counts[0], 8);
}

#[test]
fn unsupported_elements() {
    let header = Header::new("QUADS", vec![]).with_mesh(
        vec![0.0, 1.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0, 1.0],
        vec![1, 2, 3, 4],
        4,
        vec![1, 2, 3, 4],
    );
    assert!(matches!(
        Mesh2D::from_header(&header),
        Err(slftools_mesh::Error::UnsupportedElement { ndp: 4, nplan: 1 })
    ));
}
