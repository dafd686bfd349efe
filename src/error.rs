use thiserror::Error;

/// Errors in the loaded configuration.
///
/// These are fatal: an [`Imagify`](crate::hook::Imagify) service cannot be
/// built from a configuration that produces one.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A rule field was paired with an operator it cannot use
    #[error("Rule {row}.{index}: field '{field}' does not support operator '{operator}'")]
    InvalidRulePairing {
        row: usize,
        index: usize,
        field: &'static str,
        operator: &'static str,
    },

    /// A REGEXP comparand failed to compile
    #[error("Rule {row}.{index}: invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        row: usize,
        index: usize,
        pattern: String,
        message: String,
    },

    /// The rules file could not be read or parsed
    #[error("Failed to load rules from {path}: {message}")]
    RulesFile { path: String, message: String },

    /// A file referenced by the configuration could not be read
    #[error("Failed to read {what} from {path}: {message}")]
    File {
        what: &'static str,
        path: String,
        message: String,
    },

    /// A setting is outside its allowed range or malformed
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// Non-fatal problems found while evaluating a rule.
///
/// These are logged and the offending rule evaluates to false.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    /// The numeric part of a MATH comparand is not a number
    #[error("MATH comparand '{comparand}' has a non-numeric value")]
    MalformedNumber { comparand: String },

    /// The tag part of a MATH comparand is not one of GT, GE, LT, LE
    #[error("MATH comparand '{comparand}' has an unknown tag")]
    UnknownMathTag { comparand: String },
}

/// Errors raised by a render backend.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Creating a new render session failed
    #[error("Failed to create render session: {0}")]
    Session(String),

    /// Loading markup into a session failed
    #[error("Render failed: {0}")]
    Render(String),

    /// Taking the screenshot failed
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Closing a session failed
    #[error("Failed to close render session: {0}")]
    Close(String),
}

/// Errors from the render worker pool.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// No worker became idle before the acquire deadline
    #[error("Render pool exhausted: no worker available after {waited_ms}ms")]
    Exhausted { waited_ms: u64 },

    /// The pool has been shut down
    #[error("Render pool is closed")]
    Closed,

    /// The job running on a worker failed
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Errors from a cache store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("Store I/O error on {key}: {message}")]
    Io { key: String, message: String },

    /// Database error
    #[error("Store database error: {0}")]
    Database(String),

    /// A blocking task running the store operation failed
    #[error("Store task failed: {0}")]
    Task(String),
}

/// Top-level error for the imagify service.
#[derive(Debug, Clone, Error)]
pub enum ImagifyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Cache store error: {0}")]
    Store(#[from] StoreError),
}
