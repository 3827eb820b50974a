pub mod credential;

pub use credential::{ActivationState, CredentialRecord, NewCredential};
