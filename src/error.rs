use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A value was read as a type it does not hold.
    #[error("type mismatch: expected a value of type `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A node or a call supplied the wrong number of arguments.
    #[error("`{function}` expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("parameter ?{index} is out of bounds for a frame of {len} value(s)")]
    ParameterOutOfBounds { index: usize, len: usize },

    #[error("function #{0} is not registered in the program")]
    UnknownFunction(usize),

    /// A host primitive reported a failure.
    #[error("primitive `{name}` failed: {message}")]
    Primitive { name: String, message: String },

    #[error("no data points to build a model from")]
    NoData,

    /// The binning search gave up on a node.
    #[error("no non-degenerate binning function found for {rows} row(s) after {attempts} attempt(s)")]
    SplitExhausted { rows: usize, attempts: usize },

    /// No grammar choice produces a value of the requested type.
    #[error("no candidate produces a value of type `{ty}` at this depth")]
    DeadEnd { ty: &'static str },

    #[error("the search coordinator was offered no candidates")]
    NoCandidates,

    #[error("the search coordinator returned `{0}`, which was not offered")]
    UnexpectedChoice(String),

    #[error("row {row} has {found} column(s), the schema has {expected}")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("scorer failed: {0}")]
    Scorer(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn primitive(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Primitive {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the synthesis loop may discard the current attempt and try
    /// again. Everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DeadEnd { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
