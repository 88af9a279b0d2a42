//! Component catalog and selection resolution.
pub mod catalog;
pub mod selection;
