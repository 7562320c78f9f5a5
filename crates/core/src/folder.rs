//! Remote folders
//!
//! Some endpoints (recursive delete, rename) echo a folder back with `null`
//! or `[]` contents even when it is not empty. A folder built that way starts
//! with unconfirmed contents: the first call to [`Folder::contents`] fetches
//! the folder once and adopts whatever the server reports, empty or not.

use jiff::Zoned;
use tokio::sync::OnceCell;

use crate::client::Client;
use crate::error::{Error, FOLDER_NOT_FOUND, Result};
use crate::file::File;
use crate::params::{CreateFolderParams, Lookup, UpdateParams};
use crate::transport::Params;

/// Id of the account's root folder, the only folder without a parent
pub const ROOT_FOLDER_ID: u64 = 0;

/// One item of a folder's contents
#[derive(Debug, Clone)]
pub enum Entry {
    File(File),
    Folder(Folder),
}

impl Entry {
    pub fn id(&self) -> u64 {
        match self {
            Entry::File(f) => f.id(),
            Entry::Folder(f) => f.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::File(f) => f.name(),
            Entry::Folder(f) => f.name(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Entry::Folder(_))
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Entry::File(f) => Some(f),
            Entry::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Entry::Folder(f) => Some(f),
            Entry::File(_) => None,
        }
    }
}

/// Attributes used to build a [`Folder`]
#[derive(Debug, Clone, Default)]
pub struct FolderParams {
    pub id: Option<u64>,
    pub path: Option<String>,
    pub name: Option<String>,
    pub parent_folder_id: Option<u64>,
    pub is_deleted: Option<bool>,
    pub created_at: Option<Zoned>,
    pub modified_at: Option<Zoned>,
    /// `None` when the response did not include contents at all
    pub contents: Option<Vec<Entry>>,
}

/// A folder stored in pCloud
#[derive(Debug, Clone)]
pub struct Folder {
    id: u64,
    path: Option<String>,
    name: String,
    parent_folder_id: Option<u64>,
    is_deleted: bool,
    created_at: Zoned,
    modified_at: Zoned,
    /// Set means confirmed
    contents: OnceCell<Vec<Entry>>,
    parent_folder: OnceCell<Box<Folder>>,
}

impl Folder {
    pub fn new(params: FolderParams) -> Result<Self> {
        let id = params.id.ok_or(Error::MissingField("id"))?;
        if id != ROOT_FOLDER_ID && params.parent_folder_id.is_none() {
            return Err(Error::MissingField("parent_folder_id"));
        }
        let confirmed = params.contents.filter(|c| !c.is_empty());

        Ok(Self {
            id,
            path: params.path,
            name: params.name.ok_or(Error::MissingField("name"))?,
            parent_folder_id: params.parent_folder_id,
            is_deleted: params.is_deleted.unwrap_or(false),
            created_at: params.created_at.ok_or(Error::MissingField("created_at"))?,
            modified_at: params
                .modified_at
                .ok_or(Error::MissingField("modified_at"))?,
            contents: OnceCell::new_with(confirmed),
            parent_folder: OnceCell::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Absolute path; nested listings do not report it
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` only for the root folder
    pub fn parent_folder_id(&self) -> Option<u64> {
        self.parent_folder_id
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn created_at(&self) -> &Zoned {
        &self.created_at
    }

    pub fn modified_at(&self) -> &Zoned {
        &self.modified_at
    }

    pub fn is_contents_confirmed(&self) -> bool {
        self.contents.initialized()
    }

    /// Contents if already confirmed, without any I/O
    pub fn cached_contents(&self) -> Option<&[Entry]> {
        self.contents.get().map(Vec::as_slice)
    }

    /// Files and folders directly inside this folder
    ///
    /// Unconfirmed contents trigger exactly one `listfolder` round trip. The
    /// result is adopted even when it is still empty, so later calls never
    /// go back to the server. A failed fetch leaves the folder unconfirmed.
    pub async fn contents(&self, client: &Client) -> Result<&[Entry]> {
        let contents = self
            .contents
            .get_or_try_init(|| async {
                tracing::debug!(folder_id = self.id, "Folder contents unconfirmed, fetching once");
                let fetched = Folder::find(client, self.id).await?;
                Ok::<_, Error>(fetched.into_contents())
            })
            .await?;
        Ok(contents.as_slice())
    }

    fn into_contents(self) -> Vec<Entry> {
        self.contents.into_inner().unwrap_or_default()
    }

    /// Fetch a folder and its contents by id
    pub async fn find(client: &Client, id: u64) -> Result<Folder> {
        Self::find_by(client, Lookup::id(id)).await
    }

    /// Fetch a folder by id or by path
    pub async fn find_by(client: &Client, lookup: Lookup) -> Result<Folder> {
        lookup.validate_present()?;
        let parser = client.parser()?;
        let query = Params::new()
            .with_opt("path", lookup.path)
            .with_opt("folderid", lookup.id);
        let response = client.get("listfolder", query).await?;
        parser.parse_folder(&response)
    }

    /// Whether a folder with this id exists
    pub async fn exists(client: &Client, id: u64) -> Result<bool> {
        match Self::find(client, id).await {
            Ok(_) => Ok(true),
            Err(Error::Api(msg)) if msg == FOLDER_NOT_FOUND => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Return the folder at the given location, creating it if needed
    ///
    /// `parent_folder_id` plus `name` takes precedence over `path`.
    pub async fn first_or_create(client: &Client, params: CreateFolderParams) -> Result<Folder> {
        let query = match params {
            CreateFolderParams {
                parent_folder_id: Some(parent),
                name: Some(name),
                ..
            } => Params::new().with("folderid", parent).with("name", name),
            CreateFolderParams {
                path: Some(path), ..
            } => Params::new().with("path", path),
            _ => {
                return Err(Error::Validation(
                    "first_or_create requires either path or both parent_folder_id and name"
                        .to_string(),
                ));
            }
        };
        let parser = client.parser()?;
        let response = client.get("createfolderifnotexists", query).await?;
        parser.parse_folder(&response)
    }

    /// Rename and/or move the folder
    pub async fn update(&self, client: &Client, params: UpdateParams) -> Result<Folder> {
        params.validate()?;
        let parser = client.parser()?;
        let query = Params::new()
            .with("folderid", self.id)
            .with_opt("tofolderid", params.parent_folder_id)
            .with_opt("toname", params.name)
            .with_opt("topath", params.path);
        let response = client.get("renamefolder", query).await?;
        parser.parse_folder(&response)
    }

    /// Delete the folder; the server refuses if it is not empty
    pub async fn delete(&self, client: &Client) -> Result<Folder> {
        let parser = client.parser()?;
        let response = client
            .get("deletefolder", Params::new().with("folderid", self.id))
            .await?;
        parser.parse_folder(&response)
    }

    /// Delete the folder and everything below it
    pub async fn delete_recursive(&self, client: &Client) -> Result<()> {
        client
            .get("deletefolderrecursive", Params::new().with("folderid", self.id))
            .await?;
        Ok(())
    }

    /// Folder containing this one, fetched once per snapshot; `None` for the root
    pub async fn parent_folder(&self, client: &Client) -> Result<Option<&Folder>> {
        let Some(parent_id) = self.parent_folder_id else {
            return Ok(None);
        };
        let folder = self
            .parent_folder
            .get_or_try_init(|| async { Folder::find(client, parent_id).await.map(Box::new) })
            .await?;
        Ok(Some(folder.as_ref()))
    }
}
