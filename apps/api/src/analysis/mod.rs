//! Request surface for the Analysis API: input validation and route handlers.

pub mod handlers;
pub mod validation;
