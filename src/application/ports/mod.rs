pub mod document_store;
pub mod object_storage;
