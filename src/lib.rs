pub mod aggregate;
pub mod boundary;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod join;
pub mod mobility;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod stats;
