pub mod cache;
pub mod commands;
pub mod error;
pub mod http;
pub mod model;
pub mod retry;
pub mod runtime;
pub mod service;
pub mod store;
pub mod sync;
pub mod upstream;
