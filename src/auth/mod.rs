mod api;
mod error;
mod model;

pub use api::{Auth, AuthListenerRegistration};
pub use error::{AuthError, AuthResult};
pub use model::{User, UserCredential};
