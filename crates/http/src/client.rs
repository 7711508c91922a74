//! Storage server client.
//!
//! Async HTTP client using `reqwest` with raw token authentication.

use std::time::Duration;

use bytes::Bytes;
use filedock_protocol::constants::MULTIPART_FILE_FIELD;
use filedock_protocol::{
    ApiResponse, ChunkUploadFields, Endpoint, ExistenceCheckRequest, MergeRequest,
    NameCheckQuery, SimpleUploadFields,
};
use filedock_transfer::ProgressSink;
use filedock_upload::UploadError;
use filedock_upload::server::{ServerFuture, StorageServer};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::{debug, trace};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Body slice handed to the connection per progress report.
const PROGRESS_SLICE: usize = 256 * 1024;

/// Errors from the storage server client.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid token")]
    InvalidToken,
}

impl From<HttpError> for UploadError {
    fn from(err: HttpError) -> Self {
        UploadError::Transport(err.to_string())
    }
}

/// Storage server reached over HTTP.
pub struct HttpStorageServer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStorageServer {
    /// Creates a client for `base_url`. A non-empty `token` is sent as-is
    /// in the `Authorization` header of every request.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        if !token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(token).map_err(|_| HttpError::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// Posts a JSON body.
    async fn post_json<T: Serialize>(
        &self,
        endpoint: Endpoint,
        body: &T,
    ) -> Result<ApiResponse, HttpError> {
        let resp = self.http.post(self.url(endpoint)).json(body).send().await?;
        decode(endpoint, resp).await
    }

    /// Sends a GET with URL-encoded query parameters.
    async fn get_query(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
    ) -> Result<ApiResponse, HttpError> {
        let resp = self.http.get(self.url(endpoint)).query(query).send().await?;
        decode(endpoint, resp).await
    }

    /// Posts a multipart form.
    async fn post_form(&self, endpoint: Endpoint, form: Form) -> Result<ApiResponse, HttpError> {
        let resp = self
            .http
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await?;
        decode(endpoint, resp).await
    }
}

async fn decode(endpoint: Endpoint, resp: reqwest::Response) -> Result<ApiResponse, HttpError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(HttpError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let body = resp.bytes().await?;
    let response: ApiResponse = serde_json::from_slice(&body)?;
    trace!(endpoint = endpoint.path(), code = response.code, "response decoded");
    Ok(response)
}

/// Builds a form from text fields plus the file part.
fn form(fields: Vec<(&'static str, String)>, file: Part) -> Form {
    fields
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value))
        .part(MULTIPART_FILE_FIELD, file)
}

/// Wraps `data` in a body that reports how much of it has been handed to
/// the connection.
fn progress_body(data: Vec<u8>, sink: Option<ProgressSink>) -> reqwest::Body {
    let Some(sink) = sink else {
        return reqwest::Body::from(data);
    };

    let data = Bytes::from(data);
    let total = data.len();
    let slices = (0..total).step_by(PROGRESS_SLICE).map(move |start| {
        let end = (start + PROGRESS_SLICE).min(total);
        let slice = data.slice(start..end);
        sink((end * 100 / total) as u8);
        Ok::<_, std::io::Error>(slice)
    });
    reqwest::Body::wrap_stream(futures_util::stream::iter(slices))
}

impl StorageServer for HttpStorageServer {
    fn check_exists(&self, request: &ExistenceCheckRequest) -> ServerFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            debug!(identifier = %request.identifier, "checking for stored file");
            Ok(self
                .post_json(Endpoint::CheckLargeFileExists, &request)
                .await?)
        })
    }

    fn upload_file(&self, fields: &SimpleUploadFields, data: Vec<u8>) -> ServerFuture<'_> {
        let fields = fields.clone();
        Box::pin(async move {
            let file = Part::bytes(data).file_name(fields.file_name.clone());
            let form = form(fields.form_fields(), file);
            Ok(self.post_form(Endpoint::Upload, form).await?)
        })
    }

    fn upload_chunk(
        &self,
        fields: &ChunkUploadFields,
        data: Vec<u8>,
        progress: Option<ProgressSink>,
    ) -> ServerFuture<'_> {
        let fields = fields.clone();
        Box::pin(async move {
            let len = data.len() as u64;
            let file = Part::stream_with_length(progress_body(data, progress), len)
                .file_name(fields.file_name.clone());
            let form = form(fields.form_fields(), file);
            Ok(self.post_form(Endpoint::UploadChunk, form).await?)
        })
    }

    fn merge(&self, request: &MergeRequest) -> ServerFuture<'_> {
        let request = request.clone();
        Box::pin(async move { Ok(self.post_json(Endpoint::MergeChunk, &request).await?) })
    }

    fn check_name_duplicate(&self, query: &NameCheckQuery) -> ServerFuture<'_> {
        let pairs = query.query_pairs();
        Box::pin(async move {
            Ok(self
                .get_query(Endpoint::CheckNameDuplicate, &pairs)
                .await?)
        })
    }
}
