use thiserror::Error;

/// Boxed error carried by a failed task.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised synchronously by the yielder API itself.
#[derive(Error, Debug)]
pub enum YieldError {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("scheduler error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("a yielder cannot be created inside an async runtime")]
    InsideRuntime,

    #[error("yielder is closed")]
    Closed,
}

/// The first failure recorded while draining a batch.
///
/// Only one is ever reported per drain; later failures are dropped and
/// their slots simply produce no value.
#[derive(Error, Debug)]
pub enum TaskFailure {
    #[error("task {seq} failed: {source}")]
    Failed {
        seq: u64,
        #[source]
        source: BoxError,
    },

    #[error("task {seq} panicked: {message}")]
    Panicked { seq: u64, message: String },
}

impl TaskFailure {
    /// Sequence number of the task that failed.
    pub fn seq(&self) -> u64 {
        match self {
            TaskFailure::Failed { seq, .. } | TaskFailure::Panicked { seq, .. } => *seq,
        }
    }

    /// Whether the task body panicked rather than returning an error.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskFailure::Panicked { .. })
    }
}
