// handlers/public/auth/mod.rs - Sign-in and sign-up
pub mod sign_in;
pub mod sign_up;
pub mod utils;

pub use sign_in::sign_in_post;
pub use sign_up::sign_up_post;
