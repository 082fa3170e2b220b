//! Database models split into domain-specific modules.

pub mod common;
pub mod interaction;
pub mod review;
pub mod user;

pub use common::*;
pub use interaction::*;
pub use review::*;
pub use user::*;
