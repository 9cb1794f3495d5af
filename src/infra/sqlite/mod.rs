pub mod documents;
pub mod queries;
pub mod repo;
pub mod rows;
pub mod schema;
