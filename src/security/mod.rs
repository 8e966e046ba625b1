pub mod extractor;
pub mod jwt;
pub mod lockout;
pub mod middleware;
pub mod reset;
pub mod sanitize;

pub use extractor::{AuthUser, ACCESS_COOKIE};
pub use jwt::TokenService;
pub use lockout::{FailureOutcome, LoginAttemptTracker};
