pub mod api;
pub mod config;

type Result<T> = anyhow::Result<T>;
