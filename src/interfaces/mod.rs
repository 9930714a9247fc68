//! Adapters that drive the application layer: the REST API and the CSV
//! menu importer.

pub mod csv;
pub mod http;
