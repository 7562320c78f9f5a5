//! pcloud-http: reqwest adapter for pcloud-core
//!
//! Provides [`ReqwestTransport`] and shortcuts for building a ready-to-use
//! [`pcloud_core::Client`].

mod client;

pub use client::ReqwestTransport;

use pcloud_core::{Client, Config, Result};

/// Client for `config`, talking HTTP through reqwest
pub fn client(config: Config) -> Result<Client> {
    Ok(Client::new(config, ReqwestTransport::new()?))
}

/// Client configured from the settings file and the environment
pub fn client_from_env() -> Result<Client> {
    client(Config::load()?)
}
