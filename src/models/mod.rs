pub mod ambient;
pub mod envelope;
pub mod session;

pub use ambient::AmbientState;
pub use envelope::{Envelope, ErrorBody, TokenPayload};
pub use session::{ActiveSession, Credentials, SessionState};
