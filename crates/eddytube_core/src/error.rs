use std::io;
use std::path::PathBuf;

/// Error taxonomy for one integration run. Every variant is terminal for the
/// current run; retry policy (smaller step, different method) lives with the
/// caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected before any stepping begins: nonpositive mass, gravity or step
    /// size, an end time not exceeding the step size, an inverted force
    /// window, or a malformed evaluation grid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The linear operator `A/dt - M` could not be inverted. Unreachable for
    /// validated settings; kept as a checked invariant rather than an
    /// assumption.
    #[error("linear operator A/dt - M is singular")]
    SingularSystem,

    /// Unknown method name passed to the adaptive driver.
    #[error("unsupported integration method '{0}'")]
    UnsupportedMethod(String),

    /// The adaptive solve stalled before reaching the end of the requested
    /// grid. The partial trajectory is discarded; `t_reached` is the last
    /// time the solver arrived at.
    #[error("integration failed at t = {t_reached}: {reason}")]
    IntegrationFailure { t_reached: f64, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    MalformedData {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }
}
