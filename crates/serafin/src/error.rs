//! Result and Error types for the serafin module

/// Type alias for `Result<T, serafin::Error>`
pub type Result<T> = core::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
/// The error type for `slftools-serafin`
pub enum Error {
    /// Underlying file I/O error
    #[error("failure in file I/O")]
    IOError(#[from] std::io::Error),

    /// Failure to deserialise a byte stream
    #[error("failed to deserialise byte stream")]
    UnableToDeserialise(#[from] Box<bincode::ErrorKind>),

    /// Failure to serialise to a JSON string
    #[error("failed serde JSON operation")]
    JSONError(#[from] serde_json::Error),

    /// File structure can not be interpreted as Serafin
    #[error("corrupt serafin file: {0}")]
    CorruptFile(String),

    /// Record markers do not agree with the content length
    #[error("unexpected byte length (expected {expected:?}, found {found:?})")]
    UnexpectedByteLength { expected: i64, found: i64 },

    /// Header fields that contradict each other
    #[error("inconsistent header: {0}")]
    InconsistentHeader(String),

    /// Time step index past the end of the file
    #[error("time index {index} out of range (file has {count} time steps)")]
    TimeIndexOutOfRange { index: usize, count: usize },

    /// Time value with no exact match in the time index
    #[error("time value {0} not found")]
    TimeValueNotFound(f64),

    /// Node index past the number of nodes
    #[error("node {node} out of range (mesh has {count} nodes)")]
    NodeOutOfRange { node: usize, count: usize },

    /// No variable name matches
    #[error("variable \"{0}\" not found")]
    VariableNotFound(String),

    /// Variable id past the number of variables
    #[error("variable id {id} out of range (file has {count} variables)")]
    VariableIdOutOfRange { id: usize, count: usize },

    /// No partition files for a parallel result set
    #[error("no partition files found for \"{0}\"")]
    PartitionsNotFound(String),

    /// Partition index past the number of partitions
    #[error("partition {index} out of range ({count} partitions)")]
    PartitionOutOfRange { index: usize, count: usize },

    /// Any operation after the file has been closed
    #[error("file is closed")]
    FileClosed,

    /// Write operation on a file opened for reading only
    #[error("file is opened read-only")]
    ReadOnly,

    /// Frame values do not match the variable and node counts
    #[error("inconsistent frame (expected {expected} values, found {found})")]
    InconsistentFrame { expected: usize, found: usize },

    /// Could not allocate an encoding buffer even for small chunks
    #[error("unable to allocate buffer to write {bytes} bytes")]
    AllocationFailure { bytes: usize },

    /// Only non-finite values over the whole file
    #[error("no finite values for {0}")]
    NoFiniteValues(String),

    /// Progress bar could not be set up
    #[error("progress bar error: {0}")]
    ProgressBar(String),
}
