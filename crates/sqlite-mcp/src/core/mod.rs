pub mod connection;
pub mod files;
pub mod format;
pub mod paths;
pub mod query;
pub mod readonly;
pub mod schema;
pub mod types;
