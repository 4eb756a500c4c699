pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AuthMiddleware, AuthenticatedUser};
pub use rate_limit::{RateLimitMiddleware, RateLimiters};
pub use request_id::RequestIdMiddleware;
