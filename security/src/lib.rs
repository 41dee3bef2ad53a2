// security/src/lib.rs
// Staff credentials: Argon2 password hashes, HS256 session tokens and
// single-use password reset tokens.

pub mod identity;
pub mod jwt;
pub mod password;
pub mod reset_token;
pub mod roles;

use std::fmt;

use lib::errors::LabError;

pub use identity::{IdentityService, NewPatient, Registration, Session};
pub use jwt::{Claims, TokenIssuer};
pub use roles::Access;

/// Custom authentication errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    UnknownEmail,
    InvalidResetToken,
    WeakPassword(&'static str),
    JwtError(String),
    PasswordHashError(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::UnknownEmail => write!(f, "Email is not connected to any account"),
            AuthError::InvalidResetToken => write!(f, "Invalid or expired token"),
            AuthError::WeakPassword(rule) => write!(f, "Weak password: {}", rule),
            AuthError::JwtError(msg) => write!(f, "JWT error: {}", msg),
            AuthError::PasswordHashError(msg) => write!(f, "Password hashing error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for LabError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::JwtError(_) => LabError::Unauthorized(err.to_string()),
            AuthError::UnknownEmail => LabError::NotFound(err.to_string()),
            AuthError::InvalidResetToken | AuthError::WeakPassword(_) => LabError::InvalidInput(err.to_string()),
            AuthError::PasswordHashError(_) => LabError::Upstream(err.to_string()),
        }
    }
}
