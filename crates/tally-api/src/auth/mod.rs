//! Session-cookie authentication
//!
//! [`SessionAuthenticator`] resolves the `session_id` cookie to a user.
//! [`middleware::session_auth_middleware`] runs it on protected routes and
//! stores the user in request extensions, where handlers pick it up through
//! the [`AuthenticatedUser`] extractor.

pub mod middleware;
pub mod models;
mod session;

pub use models::AuthenticatedUser;
pub use session::{session_token_from_headers, SessionAuthenticator, SESSION_COOKIE};
