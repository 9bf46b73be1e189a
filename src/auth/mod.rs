mod helpers;
mod middleware;
mod token;

pub use middleware::{AuthError, RequestScope, RequireUser};
pub use token::{TokenGenerator, issue_token, parse_token};
