pub mod api;
pub mod command;
pub mod config;
pub mod db;
pub mod editor;
pub mod filesystem;
pub mod image_definition;
pub mod media;
