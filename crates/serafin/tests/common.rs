//! Shared builders for the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use slftools_serafin::{Encoding, Header, SerafinWriter, Variable};

/// Regular grid of `nx * ny` nodes split into right triangles
pub fn grid_header(nx: usize, ny: usize) -> Header {
    let mut x = Vec::with_capacity(nx * ny);
    let mut y = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            x.push(i as f64);
            y.push(j as f64);
        }
    }

    let mut ikle = Vec::new();
    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            let n = (j * nx + i + 1) as i32;
            let above = n + nx as i32;
            ikle.extend([n, n + 1, above + 1]);
            ikle.extend([n, above + 1, above]);
        }
    }

    let ipobo = (0..nx * ny).map(|n| n as i32 % 3).collect();

    Header::new(
        "GRID TEST",
        vec![
            Variable::new("VELOCITY U", "M/S"),
            Variable::new("VELOCITY V", "M/S"),
            Variable::new("WATER DEPTH", "M"),
        ],
    )
    .with_mesh(x, y, ikle, 3, ipobo)
}

/// Value stored for a time step, variable, and node
///
/// Exactly representable in single precision for small grids.
pub fn value(t: usize, v: usize, node: usize) -> f64 {
    (t * 100 + v * 10 + node) as f64
}

/// Every variable at time step `t` as `[variable][node]`
pub fn frame_values(header: &Header, t: usize) -> Vec<Vec<f64>> {
    (0..header.variable_count())
        .map(|v| (0..header.npoin).map(|n| value(t, v, n)).collect())
        .collect()
}

/// Write a complete file with one record per time stamp
pub fn write_file(path: &Path, header: &Header, encoding: Encoding, times: &[f64]) -> PathBuf {
    let mut writer = SerafinWriter::create(path, header, encoding).unwrap();
    for (t, time) in times.iter().enumerate() {
        writer.write_frame(*time, &frame_values(header, t)).unwrap();
    }
    writer.finish().unwrap();
    path.to_path_buf()
}
