pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod images;
pub mod models;
pub mod tmdb;
