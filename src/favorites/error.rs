use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FavoritesErrorCode {
    InvalidArgument,
    NotFound,
    FetchFailed,
    MutationFailed,
    SubscriptionFailed,
    DeadlineExceeded,
    Disposed,
    Internal,
}

impl FavoritesErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FavoritesErrorCode::InvalidArgument => "favorites/invalid-argument",
            FavoritesErrorCode::NotFound => "favorites/not-found",
            FavoritesErrorCode::FetchFailed => "favorites/fetch-failed",
            FavoritesErrorCode::MutationFailed => "favorites/mutation-failed",
            FavoritesErrorCode::SubscriptionFailed => "favorites/subscription-failed",
            FavoritesErrorCode::DeadlineExceeded => "favorites/deadline-exceeded",
            FavoritesErrorCode::Disposed => "favorites/disposed",
            FavoritesErrorCode::Internal => "favorites/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FavoritesError {
    pub code: FavoritesErrorCode,
    message: String,
}

impl FavoritesError {
    pub fn new(code: FavoritesErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for FavoritesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for FavoritesError {}

pub type FavoritesResult<T> = Result<T, FavoritesError>;

pub fn invalid_argument(message: impl Into<String>) -> FavoritesError {
    FavoritesError::new(FavoritesErrorCode::InvalidArgument, message)
}

pub fn not_found(message: impl Into<String>) -> FavoritesError {
    FavoritesError::new(FavoritesErrorCode::NotFound, message)
}

pub fn fetch_failed(message: impl Into<String>) -> FavoritesError {
    FavoritesError::new(FavoritesErrorCode::FetchFailed, message)
}

pub fn mutation_failed(message: impl Into<String>) -> FavoritesError {
    FavoritesError::new(FavoritesErrorCode::MutationFailed, message)
}

pub fn subscription_failed(message: impl Into<String>) -> FavoritesError {
    FavoritesError::new(FavoritesErrorCode::SubscriptionFailed, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> FavoritesError {
    FavoritesError::new(FavoritesErrorCode::DeadlineExceeded, message)
}

pub fn disposed() -> FavoritesError {
    FavoritesError::new(
        FavoritesErrorCode::Disposed,
        "FavoritesProvider has been disposed",
    )
}

pub fn internal_error(message: impl Into<String>) -> FavoritesError {
    FavoritesError::new(FavoritesErrorCode::Internal, message)
}
