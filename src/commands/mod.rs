//! CLI command handlers.
//!
//! Each handler takes an already built [`RegistryService`](crate::service::RegistryService)
//! and writes its result as JSON to the given writer.

pub mod config;
pub mod services;

mod owner;
mod publish;
mod show;
mod star;
mod sync;
mod tag;

pub use owner::owner_add;
pub use publish::publish;
pub use show::show;
pub use star::{star, unstar};
pub use sync::sync;
pub use tag::tag;
