//! Mesh topology analysis for TELEMAC Serafin results
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
mod boundary;
mod error;
mod locate;
mod mesh2d;
mod probe;
mod quality;

pub mod vtk;

// inline the important mesh types for a nice public API
#[doc(inline)]
pub use boundary::{is_ccw, Boundaries};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use locate::barycentric_weights;

#[doc(inline)]
pub use mesh2d::{edge, Edge, Mesh2D};

#[doc(inline)]
pub use probe::{Probe, ELEVATION_NAMES};

#[doc(inline)]
pub use quality::{write_json, MeshStatistics, TriangleQuality};

#[doc(inline)]
pub use vtk::{frame_to_vtk, write_vtk, VtkFormat};
