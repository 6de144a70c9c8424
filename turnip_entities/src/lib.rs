//! sea-orm entities for the database-backed stores.

pub mod completion_cache;
pub mod turn_records;
