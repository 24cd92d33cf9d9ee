//! User authentication: credentials, session tokens and route guards

pub mod error;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use error::AuthError;
pub use jwt::{Claims, TokenManager, TokenPair, TokenType};
pub use service::UserAuthService;
