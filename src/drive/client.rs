//! HTTP implementation of [`RemoteStore`] against the drive v2 API.

use super::api::{child_query, FileList, FileMetadata, FileResource};
use super::{ChildFilter, RemoteResource, RemoteStore, Session};
use crate::config::ApiSettings;
use crate::error::UploadError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response};
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Remote store client speaking the drive v2 file-resource protocol.
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
    upload_url: String,
    session: Session,
}

impl DriveClient {
    pub fn new(settings: &ApiSettings, session: Session) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("driveup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            upload_url: settings.upload_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.base_url)
    }

    fn into_resource(&self, file: FileResource, parent: &str) -> RemoteResource {
        RemoteResource {
            id: file.id,
            name: file.title,
            parent: Some(parent.to_string()),
        }
    }
}

/// Turn a non-success response into an [`UploadError::Api`] carrying the body.
async fn error_for_response(response: Response) -> Result<Response, UploadError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Api { status, body })
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_children(
        &self,
        parent: &str,
        filter: &ChildFilter,
    ) -> Result<Vec<RemoteResource>, UploadError> {
        let q = child_query(parent, filter);
        debug!(query = %q, "listing remote children");

        let mut resources = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(self.files_url())
                .bearer_auth(self.session.bearer())
                .query(&[("q", q.as_str()), ("maxResults", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = error_for_response(request.send().await?).await?;
            let page: FileList = response.json().await?;
            resources.extend(
                page.items
                    .into_iter()
                    .map(|file| self.into_resource(file, parent)),
            );
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(resources)
    }

    async fn create_folder(
        &self,
        parent: &str,
        name: &str,
    ) -> Result<RemoteResource, UploadError> {
        debug!(parent_id = %parent, name = %name, "creating remote folder");
        let metadata = FileMetadata::folder(name, parent);
        let response = self
            .http
            .post(self.files_url())
            .bearer_auth(self.session.bearer())
            .json(&metadata)
            .send()
            .await?;
        let response = error_for_response(response).await?;
        let created: FileResource = response.json().await?;
        Ok(self.into_resource(created, parent))
    }

    async fn upload_file(
        &self,
        parent: &str,
        name: &str,
        source: &Path,
    ) -> Result<RemoteResource, UploadError> {
        let metadata = FileMetadata::file(name, parent);
        let metadata_part =
            Part::text(serde_json::to_string(&metadata)?).mime_str("application/json")?;

        let file = tokio::fs::File::open(source).await?;
        let length = file.metadata().await?.len();
        let content_part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
            .file_name(name.to_string())
            .mime_str("application/octet-stream")?;

        debug!(parent_id = %parent, name = %name, bytes = length, "uploading file content");
        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", content_part);
        let response = self
            .http
            .post(format!("{}/files", self.upload_url))
            .query(&[("uploadType", "multipart")])
            .bearer_auth(self.session.bearer())
            .multipart(form)
            .send()
            .await?;
        let response = error_for_response(response).await?;
        let created: FileResource = response.json().await?;
        Ok(self.into_resource(created, parent))
    }
}
