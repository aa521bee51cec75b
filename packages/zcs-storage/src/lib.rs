pub mod db;
pub mod leases;
pub mod migrations;
pub mod models;
pub mod nodes;
pub mod outbox;
pub mod projects;
pub mod schema;
pub mod settings;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
