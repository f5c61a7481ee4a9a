//! Application layer - use cases and services

pub mod api;
pub mod services;

pub use api::{handle_create_account, handle_json, ApiReply, ApiResponse, CreateAccountRequest};
pub use services::{RelayService, RelayStage};
