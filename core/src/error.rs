use std::fmt;

use thiserror::Error;

/// Hvilken halvdel av økta en feil gjelder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    First,
    Second,
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Half::First => f.write_str("first"),
            Half::Second => f.write_str("second"),
        }
    }
}

/// Ugyldig eller utilstrekkelig input (InputValidationError).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("workout has no samples")]
    Empty,

    #[error("workout has {len} samples, at least {min} are required")]
    TooFewSamples { len: usize, min: usize },

    #[error("timestamp {t}s at index {index} does not increase on {prev}s")]
    NonMonotonic { index: usize, prev: f64, t: f64 },

    #[error("invalid {field} at index {index}: {value}")]
    InvalidValue {
        index: usize,
        field: &'static str,
        value: f64,
    },
}

/// Degenererte statistikker (ComputationError).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("mean heart rate is zero in the {0} half")]
    ZeroHeartRate(Half),

    #[error("efficiency factor of the first half is zero, decoupling is undefined")]
    ZeroEfficiency,
}

/// Feil fra selve scoreberegningen.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

impl ScoreError {
    pub fn is_input_error(&self) -> bool {
        matches!(self, ScoreError::Input(_))
    }

    /// Kort nøkkel til metrikk-labels og skip-årsaker.
    pub fn reason_key(&self) -> &'static str {
        match self {
            ScoreError::Input(InputError::Empty) => "empty",
            ScoreError::Input(InputError::TooFewSamples { .. }) => "too_few_samples",
            ScoreError::Input(InputError::NonMonotonic { .. }) => "non_monotonic",
            ScoreError::Input(InputError::InvalidValue { .. }) => "invalid_value",
            ScoreError::Computation(ComputationError::ZeroHeartRate(_)) => "zero_heart_rate",
            ScoreError::Computation(ComputationError::ZeroEfficiency) => "zero_efficiency",
        }
    }
}

/// Samlefeil for alt rundt kjernen: parsing, fil-IO, konfig og Strava.
#[derive(Debug, Error)]
pub enum CorsaError {
    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("could not parse {what} at `{path}`: {message}")]
    Parse {
        what: String,
        path: String,
        message: String,
    },

    #[error("unsupported workout format: {0}")]
    UnsupportedFormat(String),

    #[error("workout `{label}` has no {stream} data")]
    MissingStream { label: String, stream: &'static str },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("strava request failed ({status:?}): {message}")]
    Http {
        status: Option<u16>,
        message: String,
    },

    #[error("strava token rejected, re-authentication required")]
    Unauthorized,
}

impl CorsaError {
    pub(crate) fn parse<E: fmt::Display>(what: &str, err: serde_path_to_error::Error<E>) -> Self {
        CorsaError::Parse {
            what: what.to_string(),
            path: err.path().to_string(),
            message: err.inner().to_string(),
        }
    }

    pub fn reason_key(&self) -> &'static str {
        match self {
            CorsaError::Score(e) => e.reason_key(),
            CorsaError::Parse { .. } => "parse",
            CorsaError::UnsupportedFormat(_) => "unsupported_format",
            CorsaError::MissingStream { .. } => "missing_stream",
            CorsaError::Csv(_) => "csv",
            CorsaError::Io(_) => "io",
            CorsaError::Config(_) => "config",
            CorsaError::Http { .. } => "http",
            CorsaError::Unauthorized => "unauthorized",
        }
    }
}

pub type Result<T> = std::result::Result<T, CorsaError>;
