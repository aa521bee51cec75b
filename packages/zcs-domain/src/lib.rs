pub mod blob;
pub mod cluster;
pub mod migration;
pub mod page;
pub mod query;
pub mod time_serde;
