pub mod authenticator;
pub mod authority;
pub mod factory;
pub mod session;
pub mod token;
pub mod verifier;

pub use authenticator::{AuthFailure, Authenticator, Identity};
pub use authority::Authority;
pub use factory::build_authenticator;
pub use session::{InMemorySessionStore, SessionKey, SessionStore};
