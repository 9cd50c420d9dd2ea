//! Accès PostgreSQL: pool de connexions et session

pub mod pool;
pub mod session;

pub use pool::{create_pool, test_connection};
pub use session::{Session, SpatialTypes};
