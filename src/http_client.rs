use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const REQUEST_TIMEOUT_SECS: u64 = 20;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client_with_timeout(timeout_secs: u64) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("betrun/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")
    })
}

pub fn http_client() -> Result<&'static Client> {
    http_client_with_timeout(REQUEST_TIMEOUT_SECS)
}
