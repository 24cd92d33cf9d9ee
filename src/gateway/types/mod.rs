//! Gateway types module
//!
//! ## Submodules
//! - [`page`]: Pagination query and `Page<T>` envelope
//! - [`response`]: Response wrapper, handler errors and error codes

pub mod page;
pub mod response;

// Re-export commonly used types at module root
pub use page::{Page, PageQuery, PageWindow};
pub use response::{Ack, ApiError, ApiResponse, ApiResult, created, error_codes, ok};
