mod credentials;
mod extract;
mod gate;
mod token;

pub use credentials::{CredentialStore, CryptoFailure};
pub use extract::Authenticated;
pub use gate::{AuthorizationGate, Forbidden};
pub use token::{TokenService, DEFAULT_TOKEN_TTL_DAYS};
