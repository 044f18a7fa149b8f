// handlers/protected/auth/mod.rs - Session inspection and termination
pub mod session;

pub use session::{session_get, sign_out_post};
