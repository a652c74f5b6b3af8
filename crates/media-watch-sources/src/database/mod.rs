pub mod client;
pub mod seasons;

pub use client::ArrDatabaseSource;
pub use seasons::season_files_available;
