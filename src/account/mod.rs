//! User accounts: rows, validation and PII masking

pub mod mask;
pub mod models;
pub mod repository;
pub mod validation;

// Re-export commonly used types
pub use models::{AdminUserView, NewUser, User, UserProfile, UserRole, UserStatus};
pub use repository::{ProfileChanges, UserRepository};
pub use validation::{Email, Phone, Username, ValidationError, validate_password_strength};
