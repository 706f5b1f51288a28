pub mod api;
pub mod config;
pub mod deleter;
pub mod idgen;
pub mod models;
pub mod service;
pub mod storage;
