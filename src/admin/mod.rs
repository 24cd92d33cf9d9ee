//! Admin dashboard, listings and account/product management

pub mod handlers;
pub mod service;

pub use service::{AdminError, AdminService, DashboardStats};
