mod error;
mod schema;
mod store;

pub use error::StoreError;
pub use store::{AuditDb, AuditEventRow, NewEvent, QueryFilter, SummaryRow};

pub type Result<T> = std::result::Result<T, StoreError>;
