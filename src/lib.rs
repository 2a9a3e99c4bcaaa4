// Library for tests to access modules

pub mod config;
pub mod derive;
pub mod docker_repo;
pub mod error;
pub mod models;
pub mod output;
pub mod render;
pub mod sampler;
pub mod version;
