pub mod verify;

pub use verify::RegistrationVerifier;
