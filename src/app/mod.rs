mod api;
mod errors;
mod types;

pub use api::{initialize_app, FirebaseApp};
pub use errors::{AppError, AppResult};
pub use types::{FirebaseAppSettings, FirebaseOptions};
