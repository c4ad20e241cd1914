pub mod error;
pub mod models;
pub mod traits;
pub mod valuation;

pub use error::*;
pub use models::*;
pub use traits::*;
