use std::path::PathBuf;

use crate::error::{CatalogError, Result};

pub const DEFAULT_NDL_ENDPOINT: &str = "https://ndlsearch.ndl.go.jp/api/sru";
pub const DEFAULT_USER_AGENT: &str = "Bookshelf/0.1";
const DB_FILENAME: &str = "bookshelf.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub ndl_endpoint: String,
    pub user_agent: String,
    pub metadata_debug: bool,
}

impl AppConfig {
    /// Resolve settings from the environment (and `.env` if present) over defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let db_path = match std::env::var("BOOKSHELF_DB_PATH") {
            Ok(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
            _ => default_db_path()?,
        };
        let ndl_endpoint = std::env::var("BOOKSHELF_NDL_ENDPOINT")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_NDL_ENDPOINT.to_string());
        let metadata_debug = std::env::var("BOOKSHELF_METADATA_DEBUG")
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        Ok(AppConfig {
            db_path,
            ndl_endpoint,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            metadata_debug,
        })
    }

    pub fn with_db_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.db_path = path;
        }
        self
    }
}

fn default_db_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "bookshelf")
        .ok_or_else(|| CatalogError::Config("could not resolve a data directory".to_string()))?;
    Ok(dirs.data_dir().join(DB_FILENAME))
}

pub(crate) fn parse_flag(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    lowered == "1" || lowered == "true" || lowered == "yes" || lowered == "on"
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn flag_values() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
