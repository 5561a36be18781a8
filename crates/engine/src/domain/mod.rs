pub mod anchors;
pub mod certificate;
pub mod config;
pub mod context;
pub mod decoder;
pub mod error;
pub mod evaluator;
pub mod identity;
pub mod verdict;
