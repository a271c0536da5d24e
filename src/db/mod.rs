pub mod connection;
pub mod migration_runner;

pub use connection::Database;
pub use migration_runner::{Migration, MigrationRunner};
