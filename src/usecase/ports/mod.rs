pub mod documents;
pub mod repo;
