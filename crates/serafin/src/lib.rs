//! Module for working with TELEMAC Serafin binaries
//!
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
mod block;
mod date;
mod encoding;
mod error;
mod file;
mod header;
mod layout;
mod mapped;
mod partition;
mod time;
mod variables;
mod writer;

// Inline anything important for a nice public API
#[doc(inline)]
pub use date::{DateBlock, ReferenceDate};

#[doc(inline)]
pub use encoding::{ByteOrder, Encoding, FloatWidth};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use file::{Frame, Mode, SerafinFile, SerafinOptions, State};

#[doc(inline)]
pub use header::Header;

#[doc(inline)]
pub use layout::{header_blocks, record_blocks, BlockDescriptor, Layout};

#[doc(inline)]
pub use mapped::NodeSeries;

#[doc(inline)]
pub use partition::{partition_file_name, Partition};

#[doc(inline)]
pub use time::TimeSelector;

#[doc(inline)]
pub use variables::{Role, Roles, Variable, VariableSelector, ROLE_NAMES};

#[doc(inline)]
pub use writer::{write_header, write_json, write_summary, SerafinWriter};
