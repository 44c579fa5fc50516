//! Local track library

pub mod library;

pub use library::{LocalFileSet, LocalLibrary};
