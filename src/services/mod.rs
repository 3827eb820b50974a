pub mod cipher;
pub mod enrollment;
pub mod totp;
pub mod verification;

pub use cipher::SecretCipher;
pub use enrollment::{EnrollmentData, EnrollmentService};
pub use totp::TotpService;
pub use verification::VerificationService;
