//! Result and Error types for slftools-mesh

/// Type alias for `Result<T, mesh::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `slftools-mesh` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed input/output stream")]
    IOError(#[from] std::io::Error),

    #[error("vtkio error")]
    VtkioError(#[from] vtkio::Error),

    #[error("failed serde JSON operation")]
    JSONError(#[from] serde_json::Error),

    #[error("serafin error")]
    SerafinError(#[from] slftools_serafin::Error),

    #[error("utility error")]
    UtilsError(#[from] slftools_utils::Error),

    /// Mesh can not be used for triangle lookups
    #[error("degenerate triangulation: {0}")]
    DegenerateTriangulation(String),

    /// Element type with no 2D projection
    #[error("unsupported element with {ndp} nodes ({nplan} planes)")]
    UnsupportedElement { ndp: usize, nplan: usize },

    /// Node or element counts that do not split into the declared planes
    #[error("{count} {what} do not divide into {nplan} planes")]
    InvalidPlaneCount {
        what: &'static str,
        count: usize,
        nplan: usize,
    },

    /// Variable needed for the operation is missing from the file
    #[error("no variable matching any of {0:?}")]
    MissingVariable(Vec<String>),

    /// Frame values do not cover every node of the mesh
    #[error("inconsistent number of values (expected {expected}, found {found})")]
    UnexpectedNumberOfValues { expected: usize, found: usize },
}
