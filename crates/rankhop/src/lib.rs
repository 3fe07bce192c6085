pub mod config;
pub mod cursor;
pub mod extract;
pub mod handler;
pub mod mitigate;
pub mod partition;
pub mod run;
pub mod sink;

pub use config::ScrapeConfig;
pub use handler::CatalogHandler;
pub use run::RunContext;
