mod account_store;
mod customers;
mod error;
mod ids;
mod transaction_log;

pub use account_store::*;
pub use customers::*;
pub use error::*;
pub use ids::*;
pub use transaction_log::*;
