//! Data types shared by the pipeline stages.

pub mod chunk;
pub mod config;
pub mod link;
pub mod outcome;
pub mod record;
pub mod request;
pub mod response;
