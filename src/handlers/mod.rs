// handlers/mod.rs - Two-tier handler architecture
//
// Public (no auth, /auth/*) → Protected (bearer session, /api/*)
pub mod public;
pub mod protected;
