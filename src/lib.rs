pub mod config;
pub mod fanout;
pub mod library;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod tmdb;
