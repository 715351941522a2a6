use reqwest::blocking::Client;

use crate::config::AppConfig;
use crate::error::{CatalogError, Result};
use crate::models::NewBook;
use crate::parser::ndl;

/// Where bibliographic records come from. The registry client is the real one;
/// tests swap in canned responses.
pub trait LookupSource {
    /// Raw SRU response body for `isbn`.
    fn fetch_record(&self, isbn: &str) -> Result<String>;
}

pub struct NdlClient {
    client: Client,
    endpoint: String,
    debug: bool,
}

impl NdlClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(NdlClient {
            client,
            endpoint: config.ndl_endpoint.clone(),
            debug: config.metadata_debug,
        })
    }

    pub fn search_url(&self, isbn: &str) -> String {
        let query = format!("isbn=\"{}\"", isbn);
        format!(
            "{}?operation=searchRetrieve&version=1.2&recordSchema=dcndl&recordPacking=xml&maximumRecords=1&query={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(&query)
        )
    }
}

impl LookupSource for NdlClient {
    fn fetch_record(&self, isbn: &str) -> Result<String> {
        let url = self.search_url(isbn);
        if self.debug {
            log::info!("[metadata-debug] ndl http start url={}", url);
        }

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/xml")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("ndl lookup for {} answered HTTP {}", isbn, status.as_u16());
            return Err(CatalogError::HttpStatus(status.as_u16()));
        }

        let body = response.text()?;
        if self.debug {
            log::info!(
                "[metadata-debug] ndl http done url={} bytes={}",
                url,
                body.len()
            );
        }
        Ok(body)
    }
}

/// Look a book up by ISBN and map the first record. One attempt, nothing cached.
/// Only a blank ISBN is rejected up front; anything else goes to the registry unchecked.
pub fn fetch_book_data(source: &dyn LookupSource, isbn: &str) -> Result<NewBook> {
    let isbn = isbn.trim();
    if isbn.is_empty() {
        return Err(CatalogError::InvalidInput("ISBN cannot be empty".to_string()));
    }

    let body = source.fetch_record(isbn)?;
    let book = ndl::parse_search_response(&body, isbn)?;
    log::info!("looked up isbn={} title=\"{}\"", isbn, book.title);
    Ok(book)
}
