//! Orders, payments and the purchase flow

pub mod error;
pub mod handlers;
pub mod models;
pub mod provisioning;
pub mod purchase;
pub mod repository;

pub use error::PurchaseError;
pub use models::{Order, OrderStatus, OrderType, OrderView, Payment, PaymentMethod, PaymentStatus};
pub use provisioning::Provisioner;
pub use purchase::{PurchaseReceipt, PurchaseRequest, PurchaseService};
pub use repository::OrderRepository;
