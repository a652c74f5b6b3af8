pub mod client;

pub use client::{tvdb_id_from_details, CatalogSource};
