pub mod capability;
pub mod config;
pub mod facade;
pub mod link;
pub mod paths;
pub mod render;
pub mod repository;
pub mod text;
