pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod shutdown;
pub mod startup;
pub mod utils;
