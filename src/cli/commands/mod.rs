pub mod auth;
pub mod document;
pub mod maintenance;
pub mod property;
pub mod server;
