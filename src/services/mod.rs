pub mod metadata_api;
