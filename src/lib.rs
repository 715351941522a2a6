pub mod books;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod lookup;
pub mod models;
pub mod parser;
pub mod search;
pub mod tags;

pub use commands::{Catalog, Request, Response};
pub use config::AppConfig;
pub use error::{CatalogError, Result};
pub use lookup::{LookupSource, NdlClient};
pub use models::{Book, DeleteOutcome, NewBook, Tag};

/// Open the configured database and registry client as one request boundary.
pub fn open_catalog(config: &AppConfig) -> Result<Catalog<NdlClient>> {
  let conn = db::open_db(&config.db_path)?;
  let client = NdlClient::new(config)?;
  log::info!(
    "catalogue ready db={} registry={}",
    config.db_path.display(),
    config.ndl_endpoint
  );
  Ok(Catalog::new(conn, client))
}
