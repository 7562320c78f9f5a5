//! pcloud-core: Core library for the pCloud API client
//!
//! This crate provides:
//! - Configuration resolution (access token, data region, timeout, host, time zone)
//! - A request executor that surfaces provider-reported errors
//! - Parsing of file and folder metadata into typed entities
//! - File and folder operations built on top of the executor
//!
//! It does not depend on any HTTP library. Requests go through the
//! [`HttpTransport`] trait; `pcloud-http` provides a reqwest implementation.

pub mod client;
pub mod config;
pub mod error;
pub mod file;
pub mod folder;
pub mod params;
pub mod parser;
pub mod time;
pub mod transport;

pub use client::Client;
pub use config::{Config, DataRegion, Environment, ProcessEnv, Settings};
pub use error::{Error, Result};
pub use file::{File, FileCategory, FileParams, Upload};
pub use folder::{Entry, Folder, FolderParams, ROOT_FOLDER_ID};
pub use params::{CreateFolderParams, Lookup, UpdateParams};
pub use parser::EntityParser;
pub use time::{TimeInput, TimeNormalizer};
pub use transport::{FilePart, Form, HttpRequest, HttpTransport, Method, Params};
