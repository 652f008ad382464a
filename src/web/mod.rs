//! Client-side behavior of the Cambigo web application, kept free of any UI
//! framework: pages hand in session snapshots and user input, and get back
//! what to render, what to show and where to navigate.

pub mod api;
pub mod auth;
pub mod errors;
pub mod pages;
pub mod settings;

pub use self::api::ApiClient;
pub use self::errors::AppError;
