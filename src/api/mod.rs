pub mod editor;
pub mod error;
pub mod handler_utils;
pub mod response;
pub mod server;
