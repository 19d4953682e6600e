pub mod backend;
pub mod download;
pub mod file_records;
pub mod object_store;
pub mod upload;
