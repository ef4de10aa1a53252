pub mod files;
pub mod posts;
