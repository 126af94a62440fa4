use thiserror::Error;

/// A location parameter that was present but could not be read
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid number for '{param}': {value:?}")]
    InvalidNumber { param: &'static str, value: String },

    #[error("'{param}' must be within {min}..={max}, got {value}")]
    OutOfRange {
        param: &'static str,
        value: String,
        min: u32,
        max: u32,
    },
}

/// A price range that breaks `min <= max` or leaves the configured domain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("inverted price range: min {min} > max {max}")]
    InvertedRange { min: f64, max: f64 },

    #[error("price {value} outside domain {lower}..={upper}")]
    OutOfDomain { value: f64, lower: f64, upper: f64 },
}

/// Coarse failure category carried by the fetch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Timeout,
    Status(u16),
    Decode,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("listing request timed out")]
    Timeout,

    #[error("listing request failed: {0}")]
    Network(String),

    #[error("listing backend returned status {0}")]
    Status(u16),

    #[error("could not decode listing response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Timeout => FetchErrorKind::Timeout,
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Status(code) => FetchErrorKind::Status(*code),
            FetchError::Decode(_) => FetchErrorKind::Decode,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Failures of the registration-number check in the sell flow
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Please enter a registration number.")]
    EmptyRegistration,

    #[error("login required")]
    LoginRequired,

    #[error("Authentication Failed! Please try logging in again.")]
    Unauthorized,

    #[error("Bad Request! Please try again. (status {0})")]
    BadRequest(u16),

    #[error("Something Went Wrong! (status {0})")]
    Server(u16),

    #[error("verification request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl VerifyError {
    /// Map a non-success HTTP status to the message category shown to the seller
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => VerifyError::Unauthorized,
            500..=599 => VerifyError::Server(status),
            _ => VerifyError::BadRequest(status),
        }
    }
}
