pub mod android;
pub mod annotator;
pub mod debug_store;
pub mod element_list;
pub mod extractor;
pub mod ios;
pub mod types;
