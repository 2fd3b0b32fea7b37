//! Google Drive v3 adapter for the `StorageApi` port.

use async_trait::async_trait;
use docketsync_core::storage::ports::StorageApi;
use docketsync_domain::constants::FOLDER_MIME_TYPE;
use docketsync_domain::{RemoteFile, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::oauth::AccessToken;
use super::types::FilesListResponse;
use crate::http::HttpClient;

const FILE_FIELDS: &str = "id,name,mimeType,webViewLink,size";
const LIST_FIELDS: &str = "files(id,name,mimeType,webViewLink)";

/// Drive client bound to one practice's access token.
pub struct GoogleDriveClient {
    http: HttpClient,
    base_url: String,
    upload_url: String,
    token: AccessToken,
}

impl GoogleDriveClient {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        upload_url: impl Into<String>,
        token: AccessToken,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_url: upload_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.base_url)
    }
}

/// Drive `q` expression matching a live folder by exact name.
pub fn folder_query(name: &str, parent_id: Option<&str>) -> String {
    let mut query = format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escape_query_literal(name),
        FOLDER_MIME_TYPE
    );
    if let Some(parent) = parent_id {
        query.push_str(&format!(" and '{}' in parents", escape_query_literal(parent)));
    }
    query
}

fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// `multipart/related` body: JSON metadata part followed by the media part.
fn multipart_related(boundary: &str, metadata: &serde_json::Value, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[async_trait]
impl StorageApi for GoogleDriveClient {
    #[instrument(skip(self))]
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<RemoteFile> {
        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME_TYPE });
        if let Some(parent) = parent_id {
            metadata["parents"] = json!([parent]);
        }

        let request = self
            .http
            .request(Method::POST, self.files_url())
            .bearer_auth(self.token.secret())
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata);

        let folder: RemoteFile = self.http.send_json(request).await?;
        debug!(folder_id = %folder.id, "folder created");
        Ok(folder)
    }

    #[instrument(skip(self))]
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Option<RemoteFile>> {
        let request = self
            .http
            .request(Method::GET, self.files_url())
            .bearer_auth(self.token.secret())
            .query(&[
                ("q", folder_query(name, parent_id).as_str()),
                ("fields", LIST_FIELDS),
                ("spaces", "drive"),
                ("pageSize", "1"),
            ]);

        let list: FilesListResponse = self.http.send_json(request).await?;
        Ok(list.files.into_iter().next())
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteFile> {
        let boundary = format!("docketsync-{}", Uuid::new_v4().simple());
        let metadata = json!({ "name": name, "parents": [parent_id], "mimeType": mime_type });
        let body = multipart_related(&boundary, &metadata, mime_type, &bytes);

        let request = self
            .http
            .request(Method::POST, format!("{}/files", self.upload_url))
            .bearer_auth(self.token.secret())
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(body);

        let file: RemoteFile = self.http.send_json(request).await?;
        debug!(file_id = %file.id, "file uploaded");
        Ok(file)
    }
}
