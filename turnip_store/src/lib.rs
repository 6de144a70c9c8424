#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Database-backed cache and result log.
//!
//! Both stores rely on the table's primary key plus `ON CONFLICT DO NOTHING`
//! for first-writer-wins inserts, so concurrent writers on different
//! processes agree on the stored value. Postgres is the production backend;
//! anything sea-orm connects to works.

mod cache;
mod convert;
mod result_log;
mod schema;

pub use cache::DatabaseCache;
pub use result_log::DatabaseResultLog;
pub use schema::connect;
