pub mod app;
pub mod db;
pub mod diagram;
pub mod models;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod utils;
