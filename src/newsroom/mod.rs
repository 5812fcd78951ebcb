//! Newsroom domain: the mock data set and the tools built on top of it.

pub mod data;
pub mod tools;

pub use data::{BusinessUnit, NewsroomData, User};
pub use tools::{build_registry, NewsroomBackend};
