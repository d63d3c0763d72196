//! Database models split into domain-specific modules.

pub mod book;
pub mod rental;
pub mod user;

pub use book::*;
pub use rental::*;
pub use user::*;
