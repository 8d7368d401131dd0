//! Operations a UI shell calls directly. Errors come back as display-ready strings.

pub mod auth;
pub mod discovery;
pub mod history;
pub mod persona;
