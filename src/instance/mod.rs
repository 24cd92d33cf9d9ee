//! Purchased servers and their lifecycle
//!
//! Every power operation is checked locally (ownership, expiry, status) and
//! then delegated to the provider adapter resolved by the server's provider
//! code.

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use models::{Server, ServerStatus, ServerView};
pub use repository::ServerRepository;
pub use service::{InstanceError, InstanceService, LifecycleAction};
