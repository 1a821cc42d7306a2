//! Trait seams between the pipeline and its external collaborators.

pub mod ai;
pub mod fetcher;
pub mod searcher;
