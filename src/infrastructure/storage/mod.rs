pub mod fs_object_storage;
