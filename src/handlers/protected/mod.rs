// handlers/protected/mod.rs - Protected handlers (bearer session required)
//
// Route prefix: /api/*. `jwt_auth_middleware` resolves the session and puts
// `AuthUser` into request extensions before any of these run.
pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod events;
pub mod maintenance;
pub mod properties;
