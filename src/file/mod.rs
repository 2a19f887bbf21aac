//! File metadata (`FileInfo`), stateful file handles, and the per-connection
//! `FileMap` address allocator (spec.md §4.4, §4.6).

pub mod file;
pub mod file_map;
pub mod info;

pub use file::File;
pub use file_map::FileMap;
pub use info::FileInfo;
