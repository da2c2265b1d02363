//! API Routes

pub mod health;
pub mod page;
pub mod submit;
