//! Saved design projects

pub mod model;
#[cfg(feature = "database")]
pub mod postgres;
pub mod store;

pub use model::{NewProject, Project, ProjectType, SaveInputs};
#[cfg(feature = "database")]
pub use postgres::PgProjectStore;
pub use store::{InMemoryProjectStore, ProjectStore};
