pub mod bulk;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod store;
pub mod timelimit;
