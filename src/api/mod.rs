//! REST API for the form-io front end

pub mod error;
pub mod presentation;
pub mod routes;

pub use error::ApiError;
pub use presentation::color_for;
pub use routes::{create_router, AppState};
