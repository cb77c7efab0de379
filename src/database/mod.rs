pub mod manager;
pub mod mapper;
pub mod models;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{PgStore, Store};
