pub mod indexing;
pub mod related;
pub mod slug;
