//! `slftools` is a semi-modular toolkit of fast and reliable libraries for
//! TELEMAC Serafin results
//!
#![doc = include_str!("../readme.md")]
#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-exports of toolkit crates.
#[doc(inline)]
pub use slftools_format as format;

#[doc(inline)]
pub use slftools_utils as utils;

#[cfg(feature = "serafin")]
#[cfg_attr(docsrs, doc(cfg(feature = "serafin")))]
#[doc(inline)]
pub use slftools_serafin as serafin;

#[cfg(feature = "mesh")]
#[cfg_attr(docsrs, doc(cfg(feature = "mesh")))]
#[doc(inline)]
pub use slftools_mesh as mesh;
