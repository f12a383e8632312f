//! Common utility for extended `std` types
//!
//! These are left public for convenience.
//!
//! For example, finding the range of a field that may contain `NaN` values or
//! binning triangle angles into a histogram are useful everywhere.

// Modules
mod error;
mod histogram;
mod slice_ext;

// Flatten
pub use error::{Error, Result};
pub use histogram::Histogram;
pub use slice_ext::SliceExt;
