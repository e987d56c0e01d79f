pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod model;
pub mod parser;
pub mod render;
pub mod tree;
