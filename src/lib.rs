pub mod config;
pub mod domain;
pub mod error;
pub mod fs;
pub mod names;
pub mod output;
pub mod path;
pub mod repository;
pub mod resolver;
pub mod response;
pub mod service;
