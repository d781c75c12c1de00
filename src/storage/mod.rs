pub mod cache;
pub mod results;
