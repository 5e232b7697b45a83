#![doc = "The `todolist` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, ownership scoping, persistence, attachment storage"]
#![doc = "and routing for the multi-user to-do API. The binary (`main.rs`) wires these"]
#![doc = "together from `Config` and runs the server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod files;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::AppState;
