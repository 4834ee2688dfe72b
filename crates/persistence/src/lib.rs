#![deny(warnings)]

pub mod connection_pool;
pub mod history;
pub mod schema;

type Result<T> = anyhow::Result<T>;
