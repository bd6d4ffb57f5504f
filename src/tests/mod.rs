//! Unit tests for the core data model.

mod version;
