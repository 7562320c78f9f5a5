//! Remote files
//!
//! A [`File`] is an immutable snapshot of the server's metadata. Operations
//! that change the file on the server return a new snapshot.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use jiff::Zoned;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::client::{Client, UPLOAD_OPERATION};
use crate::error::{Error, FILE_NOT_FOUND, Result};
use crate::folder::Folder;
use crate::params::{Lookup, UpdateParams};
use crate::transport::{Form, Params};

/// Coarse content classification assigned by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    #[default]
    Uncategorized,
    Image,
    Video,
    Audio,
    Document,
    Archive,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Uncategorized => "uncategorized",
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Document => "document",
            FileCategory::Archive => "archive",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u64> for FileCategory {
    type Error = Error;

    fn try_from(code: u64) -> Result<Self> {
        match code {
            0 => Ok(FileCategory::Uncategorized),
            1 => Ok(FileCategory::Image),
            2 => Ok(FileCategory::Video),
            3 => Ok(FileCategory::Audio),
            4 => Ok(FileCategory::Document),
            5 => Ok(FileCategory::Archive),
            other => Err(Error::UnknownCategory(other)),
        }
    }
}

/// Attributes used to build a [`File`]
#[derive(Debug, Clone, Default)]
pub struct FileParams {
    pub id: Option<u64>,
    pub path: Option<String>,
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub category_id: Option<u64>,
    pub size: Option<u64>,
    pub parent_folder_id: Option<u64>,
    pub is_deleted: Option<bool>,
    pub created_at: Option<Zoned>,
    pub modified_at: Option<Zoned>,
}

/// A file stored in pCloud
#[derive(Debug, Clone)]
pub struct File {
    id: u64,
    path: Option<String>,
    name: String,
    content_type: String,
    category: FileCategory,
    size: u64,
    parent_folder_id: u64,
    is_deleted: bool,
    created_at: Zoned,
    modified_at: Zoned,
    parent_folder: OnceCell<Box<Folder>>,
    download_base: OnceCell<String>,
}

impl File {
    pub fn new(params: FileParams) -> Result<Self> {
        let category = match params.category_id {
            Some(code) => FileCategory::try_from(code)?,
            None => FileCategory::Uncategorized,
        };

        Ok(Self {
            id: params.id.ok_or(Error::MissingField("id"))?,
            path: params.path,
            name: params.name.ok_or(Error::MissingField("name"))?,
            content_type: params
                .content_type
                .ok_or(Error::MissingField("content_type"))?,
            category,
            size: params.size.ok_or(Error::MissingField("size"))?,
            parent_folder_id: params
                .parent_folder_id
                .ok_or(Error::MissingField("parent_folder_id"))?,
            is_deleted: params.is_deleted.unwrap_or(false),
            created_at: params.created_at.ok_or(Error::MissingField("created_at"))?,
            modified_at: params
                .modified_at
                .ok_or(Error::MissingField("modified_at"))?,
            parent_folder: OnceCell::new(),
            download_base: OnceCell::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Absolute path; some endpoints do not report it
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn category(&self) -> FileCategory {
        self.category
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn parent_folder_id(&self) -> u64 {
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

    /// Fetch a file by id
    pub async fn find(client: &Client, id: u64) -> Result<File> {
        let parser = client.parser()?;
        let response = client.get("stat", Params::new().with("fileid", id)).await?;
        parser.parse_file(&response)
    }

    /// Fetch a file by id or by path, but not both
    pub async fn find_by(client: &Client, lookup: Lookup) -> Result<File> {
        lookup.validate_exclusive()?;
        let parser = client.parser()?;
        let query = Params::new()
            .with_opt("path", lookup.path)
            .with_opt("fileid", lookup.id);
        let response = client.get("stat", query).await?;
        parser.parse_file(&response)
    }

    /// Whether a file with this id exists
    pub async fn exists(client: &Client, id: u64) -> Result<bool> {
        match Self::find(client, id).await {
            Ok(_) => Ok(true),
            Err(Error::Api(msg)) if msg == FILE_NOT_FOUND => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Rename and/or move the file
    ///
    /// Only the fields that are set are sent.
    pub async fn update(&self, client: &Client, params: UpdateParams) -> Result<File> {
        params.validate()?;
        let parser = client.parser()?;
        let query = Params::new()
            .with("fileid", self.id)
            .with_opt("tofolderid", params.parent_folder_id)
            .with_opt("toname", params.name)
            .with_opt("topath", params.path);
        let response = client.get("renamefile", query).await?;
        parser.parse_file(&response)
    }

    pub async fn delete(&self, client: &Client) -> Result<File> {
        let parser = client.parser()?;
        let response = client
            .get("deletefile", Params::new().with("fileid", self.id))
            .await?;
        parser.parse_file(&response)
    }

    /// Folder containing this file, fetched once per snapshot
    pub async fn parent_folder(&self, client: &Client) -> Result<&Folder> {
        let folder = self
            .parent_folder
            .get_or_try_init(|| async {
                Folder::find(client, self.parent_folder_id).await.map(Box::new)
            })
            .await?;
        Ok(folder.as_ref())
    }

    /// Direct download link
    ///
    /// The link is requested once per snapshot; the file name is appended on
    /// every call so the result always matches [`File::name`].
    pub async fn download_url(&self, client: &Client) -> Result<String> {
        let base = self
            .download_base
            .get_or_try_init(|| async {
                let query = Params::new()
                    .with("fileid", self.id)
                    .with("forcedownload", 1)
                    .with("skipfilename", 1);
                let response = client.get("getfilelink", query).await?;
                download_base(&response)
            })
            .await?;
        Ok(format!("{base}/{}", urlencoding::encode(&self.name)))
    }

    /// Upload a new file, letting the server rename it on a name clash
    pub async fn upload(client: &Client, upload: Upload) -> Result<File> {
        Self::process_upload(client, upload, false).await
    }

    /// Upload a file, replacing any existing file with the same name
    pub async fn upload_overwrite(client: &Client, upload: Upload) -> Result<File> {
        Self::process_upload(client, upload, true).await
    }

    async fn process_upload(client: &Client, upload: Upload, overwrite: bool) -> Result<File> {
        if upload.filename.is_empty() {
            return Err(Error::Validation("filename is required".to_string()));
        }
        let parser = client.parser()?;

        // Without path or folderid the server uploads into the root folder.
        let fields = Params::new()
            .with("renameifexists", if overwrite { 0 } else { 1 })
            .with_opt("path", upload.path)
            .with_opt("folderid", upload.folder_id)
            .with("filename", &upload.filename);
        let body = Form::new()
            .fields(fields)
            .file("file", upload.filename, upload.content);

        let response = client.execute(UPLOAD_OPERATION, Params::new(), body).await?;

        // The endpoint accepts several files at once; only one is ever sent here.
        parser
            .parse_files(&response)?
            .into_iter()
            .next()
            .ok_or(Error::UploadFailed)
    }
}

fn download_base(response: &serde_json::Value) -> Result<String> {
    let host = response
        .get("hosts")
        .and_then(|h| h.get(0))
        .and_then(|h| h.as_str())
        .ok_or_else(|| Error::InvalidResponse("getfilelink returned no hosts".to_string()))?;
    let path = response
        .get("path")
        .and_then(|p| p.as_str())
        .ok_or_else(|| Error::InvalidResponse("getfilelink returned no path".to_string()))?;
    Ok(format!("https://{host}{path}"))
}

/// A file to upload
#[derive(Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Bytes,
    /// Destination folder path
    pub path: Option<String>,
    /// Destination folder id
    pub folder_id: Option<u64>,
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("filename", &self.filename)
            .field("len", &self.content.len())
            .field("path", &self.path)
            .field("folder_id", &self.folder_id)
            .finish()
    }
}

impl Upload {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            path: None,
            folder_id: None,
        }
    }

    /// Read a local file, naming the upload after it
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::Validation(format!("{} has no usable file name", path.display()))
            })?
            .to_string();
        let content = tokio::fs::read(path).await?;
        Ok(Self::new(filename, content))
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn folder_id(mut self, folder_id: u64) -> Self {
        self.folder_id = Some(folder_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_client;
    use crate::time::TimeNormalizer;
    use crate::transport::{HttpRequest, Method, MockHttpTransport};
    use serde_json::{Value, json};

    const CREATED: &str = "Sat, 25 Sep 2021 04:44:32 +0000";

    fn cat_photo() -> File {
        let normalizer = TimeNormalizer::default();
        File::new(FileParams {
            id: Some(100100),
            path: Some("/cats.jpg".to_string()),
            name: Some("cats.jpg".to_string()),
            content_type: Some("image/jpg".to_string()),
            category_id: Some(1),
            size: Some(1992312),
            parent_folder_id: Some(9000),
            is_deleted: Some(false),
            created_at: Some(normalizer.normalize(CREATED).unwrap()),
            modified_at: Some(normalizer.normalize(CREATED).unwrap()),
        })
        .unwrap()
    }

    fn file_metadata(id: u64, name: &str) -> Value {
        json!({
            "fileid": id,
            "path": format!("/{name}"),
            "name": name,
            "contenttype": "image/jpg",
            "category": 1,
            "size": 1992312,
            "parentfolderid": 9000,
            "created": CREATED,
            "modified": CREATED
        })
    }

    fn folder_metadata() -> Value {
        json!({
            "folderid": 9000,
            "path": "/jacks_folder",
            "name": "jacks_folder",
            "parentfolderid": 0,
            "isfolder": true,
            "created": CREATED,
            "modified": CREATED,
            "contents": []
        })
    }

    #[test]
    fn test_category_codes() {
        let expected = [
            "uncategorized",
            "image",
            "video",
            "audio",
            "document",
            "archive",
        ];
        for (code, label) in expected.iter().enumerate() {
            assert_eq!(FileCategory::try_from(code as u64).unwrap().as_str(), *label);
        }
        assert!(matches!(FileCategory::try_from(6), Err(Error::UnknownCategory(6))));
    }

    #[test]
    fn test_new_defaults() {
        let mut params = FileParams {
            category_id: None,
            is_deleted: None,
            ..cat_photo_params()
        };
        let file = File::new(params.clone()).unwrap();
        assert_eq!(file.category(), FileCategory::Uncategorized);
        assert!(!file.is_deleted());

        params.name = None;
        assert!(matches!(File::new(params), Err(Error::MissingField("name"))));
    }

    fn cat_photo_params() -> FileParams {
        let file = cat_photo();
        FileParams {
            id: Some(file.id),
            path: file.path.clone(),
            name: Some(file.name.clone()),
            content_type: Some(file.content_type.clone()),
            category_id: Some(1),
            size: Some(file.size),
            parent_folder_id: Some(file.parent_folder_id),
            is_deleted: Some(file.is_deleted),
            created_at: Some(file.created_at.clone()),
            modified_at: Some(file.modified_at.clone()),
        }
    }

    #[tokio::test]
    async fn test_find() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.url.ends_with("/stat")
                    && req.query.as_ref().is_some_and(|q| q.get("fileid") == Some("100100"))
            })
            .returning(|_| Ok(json!({ "metadata": file_metadata(100100, "cats.jpg") }).to_string()));

        let client = test_client(transport);
        let file = File::find(&client, 100100).await.unwrap();
        assert_eq!(file.name(), "cats.jpg");
    }

    #[tokio::test]
    async fn test_find_by_path() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.query
                    .as_ref()
                    .is_some_and(|q| q.keys() == vec!["path"] && q.get("path") == Some("/cats.jpg"))
            })
            .returning(|_| Ok(json!({ "metadata": file_metadata(100100, "cats.jpg") }).to_string()));

        let client = test_client(transport);
        let file = File::find_by(&client, Lookup::path("/cats.jpg")).await.unwrap();
        assert_eq!(file.id(), 100100);
    }

    #[tokio::test]
    async fn test_find_by_both_fails_before_request() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();

        let client = test_client(transport);
        let lookup = Lookup {
            id: Some(100100),
            path: Some("/cats.jpg".to_string()),
        };
        let err = File::find_by(&client, lookup).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_exists() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.query.as_ref().is_some_and(|q| q.get("fileid") == Some("1"))
            })
            .returning(|_| Ok(json!({ "metadata": file_metadata(1, "cats.jpg") }).to_string()));
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.query.as_ref().is_some_and(|q| q.get("fileid") == Some("2"))
            })
            .returning(|_| Ok(json!({ "result": 2009, "error": "File not found." }).to_string()));
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.query.as_ref().is_some_and(|q| q.get("fileid") == Some("3"))
            })
            .returning(|_| Ok(json!({ "result": 2000, "error": "Log in failed." }).to_string()));

        let client = test_client(transport);
        assert!(File::exists(&client, 1).await.unwrap());
        assert!(!File::exists(&client, 2).await.unwrap());
        let err = File::exists(&client, 3).await.unwrap_err();
        assert_eq!(err.api_message(), Some("Log in failed."));
    }

    #[tokio::test]
    async fn test_rename_sends_only_set_fields() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.url.ends_with("/renamefile")
                    && req.query.as_ref().is_some_and(|q| {
                        q.keys() == vec!["fileid", "toname"]
                            && q.get("fileid") == Some("100100")
                            && q.get("toname") == Some("dogs.jpg")
                    })
            })
            .returning(|_| Ok(json!({ "metadata": file_metadata(100100, "dogs.jpg") }).to_string()));

        let client = test_client(transport);
        let original = cat_photo();
        let renamed = original
            .update(&client, UpdateParams::new().name("dogs.jpg"))
            .await
            .unwrap();

        assert_eq!(renamed.name(), "dogs.jpg");
        assert_eq!(original.name(), "cats.jpg");
    }

    #[tokio::test]
    async fn test_move_sends_folder_and_path() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.query.as_ref().is_some_and(|q| {
                    q.keys() == vec!["fileid", "tofolderid", "topath"]
                        && q.get("tofolderid") == Some("42")
                        && q.get("topath") == Some("/pets/")
                })
            })
            .returning(|_| Ok(json!({ "metadata": file_metadata(100100, "cats.jpg") }).to_string()));

        let client = test_client(transport);
        cat_photo()
            .update(&client, UpdateParams::new().parent_folder_id(42).path("/pets/"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_invalid_path_fails_before_request() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();

        let client = test_client(transport);
        let err = cat_photo()
            .update(&client, UpdateParams::new().path("/pets"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.url.ends_with("/deletefile")
                    && req.query.as_ref().is_some_and(|q| q.get("fileid") == Some("100100"))
            })
            .returning(|_| {
                let mut metadata = file_metadata(100100, "cats.jpg");
                metadata["isdeleted"] = json!(true);
                Ok(json!({ "metadata": metadata }).to_string())
            });

        let client = test_client(transport);
        let original = cat_photo();
        let deleted = original.delete(&client).await.unwrap();
        assert!(deleted.is_deleted());
        assert!(!original.is_deleted());
    }

    #[tokio::test]
    async fn test_parent_folder_is_fetched_once() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.url.ends_with("/listfolder")
                    && req.query.as_ref().is_some_and(|q| q.get("folderid") == Some("9000"))
            })
            .returning(|_| Ok(json!({ "metadata": folder_metadata() }).to_string()));

        let client = test_client(transport);
        let file = cat_photo();
        assert_eq!(file.parent_folder(&client).await.unwrap().id(), 9000);
        assert_eq!(file.parent_folder(&client).await.unwrap().name(), "jacks_folder");
    }

    #[tokio::test]
    async fn test_download_url_is_cached() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.url.ends_with("/getfilelink")
                    && req.query.as_ref().is_some_and(|q| {
                        q.get("fileid") == Some("100100")
                            && q.get("forcedownload") == Some("1")
                            && q.get("skipfilename") == Some("1")
                    })
            })
            .returning(|_| {
                Ok(json!({
                    "hosts": ["edef.pcloud.com", "eaaa.pcloud.com"],
                    "path": "/cBZkvG2cXZ"
                })
                .to_string())
            });

        let client = test_client(transport);
        let file = cat_photo();
        let expected = "https://edef.pcloud.com/cBZkvG2cXZ/cats.jpg";
        assert_eq!(file.download_url(&client).await.unwrap(), expected);
        assert_eq!(file.download_url(&client).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_download_url_encodes_name() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(json!({ "hosts": ["edef.pcloud.com"], "path": "/abc" }).to_string()));

        let client = test_client(transport);
        let file = File::new(FileParams {
            name: Some("cat pics.jpg".to_string()),
            ..cat_photo_params()
        })
        .unwrap();
        assert_eq!(
            file.download_url(&client).await.unwrap(),
            "https://edef.pcloud.com/abc/cat%20pics.jpg"
        );
    }

    #[tokio::test]
    async fn test_upload() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                let Some(body) = req.body.as_ref() else {
                    return false;
                };
                req.method == Method::Post
                    && req.url.ends_with("/uploadfile")
                    && body.fields.keys() == vec!["renameifexists", "folderid", "filename"]
                    && body.fields.get("renameifexists") == Some("1")
                    && body.fields.get("folderid") == Some("9000")
                    && body.files.len() == 1
                    && body.files[0].filename == "cats.jpg"
                    && body.files[0].content.as_ref() == b"meow"
            })
            .returning(|_| {
                Ok(json!({ "result": 0, "metadata": [file_metadata(100100, "cats.jpg")] }).to_string())
            });

        let client = test_client(transport);
        let upload = Upload::new("cats.jpg", b"meow".to_vec()).folder_id(9000);
        let file = File::upload(&client, upload).await.unwrap();
        assert_eq!(file.id(), 100100);
    }

    #[tokio::test]
    async fn test_upload_overwrite() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req: &HttpRequest| {
                req.body
                    .as_ref()
                    .is_some_and(|b| b.fields.get("renameifexists") == Some("0"))
            })
            .returning(|_| Ok(json!({ "metadata": [file_metadata(100100, "cats.jpg")] }).to_string()));

        let client = test_client(transport);
        let upload = Upload::new("cats.jpg", b"meow".to_vec()).path("/");
        File::upload_overwrite(&client, upload).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_with_empty_result_fails() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(json!({ "result": 0, "metadata": [] }).to_string()));

        let client = test_client(transport);
        let err = File::upload(&client, Upload::new("cats.jpg", b"meow".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UploadFailed));
    }

    #[tokio::test]
    async fn test_upload_requires_filename() {
        let mut transport = MockHttpTransport::new();
        transport.expect_send().never();

        let client = test_client(transport);
        let err = File::upload(&client, Upload::new("", b"meow".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_upload_from_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("cats.jpg");
        std::fs::write(&path, b"meow").unwrap();

        let upload = Upload::from_path(&path).await.unwrap();
        assert_eq!(upload.filename, "cats.jpg");
        assert_eq!(upload.content.as_ref(), b"meow");

        let missing = Upload::from_path(temp_dir.path().join("dogs.jpg")).await;
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
