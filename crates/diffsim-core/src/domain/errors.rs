use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SimResult<T> = Result<T, SimError>;
pub type ConfigResult<T> = SimResult<T>;

/// Failure classes of a simulation run. Every class aborts the run; the
/// process exit code is derived from the class alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimErrorCategory {
    /// Rejected keywords, values or input files, raised at construction.
    Configuration,
    Io,
    /// Numerical failure during propagation (sampler exhaustion, shape
    /// mismatch, unusable detector noise parameters).
    Computation,
    Internal,
}

impl SimErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::Io => 3,
            Self::Computation => 4,
            Self::Internal => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Io => "IoError",
            Self::Computation => "ComputationError",
            Self::Internal => "InternalError",
        }
    }
}

impl Display for SimErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Error value shared by every component of the simulator.
///
/// `placeholder` is a stable dotted code (`CONFIG.MISSING_KEYWORD`) that
/// callers and tests match on instead of the free-form message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimError {
    category: SimErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl SimError {
    pub fn new(
        category: SimErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::Configuration, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::Io, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::Computation, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SimErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> SimErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn is_configuration(&self) -> bool {
        self.category == SimErrorCategory::Configuration
    }

    /// `ERROR: [PLACEHOLDER] message`, the first line the CLI prints.
    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.category, self.placeholder, self.message)
    }
}

impl Error for SimError {}
