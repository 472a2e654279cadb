//! Google Drive v3 client
//!
//! Authenticates as a service account (RS256-signed JWT exchanged for an
//! OAuth access token) and implements [`RemoteStore`] over the Drive REST API.
//! Uploads use the resumable protocol and are sent in fixed-size chunks; a
//! chunk that fails is retried from the range the server reports as committed.

use super::remote_store::{DeleteOutcome, RemoteObject, RemoteStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FILE_FIELDS: &str = "id,name,createdTime";

/// Drive requires chunk sizes in multiples of 256 KiB
const CHUNK_GRANULARITY: u64 = 256 * 1024;
/// Attempts allowed at one offset before the upload is abandoned
const MAX_CHUNK_ATTEMPTS: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
/// Refresh the access token this long before it expires
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Service-account key file as downloaded from the cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Load a key from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials file {:?}", path))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Build the signed JWT assertion for the token exchange
fn sign_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String> {
    let claims = Claims {
        iss: &key.client_email,
        scope: DRIVE_FILE_SCOPE,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + 3600,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("Service-account private key is not a valid RSA PEM")?;
    jsonwebtoken::encode(&header, &claims, &encoding_key).context("Failed to sign token assertion")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// File resource as returned by the Drive API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    created_time: DateTime<Utc>,
}

impl DriveFile {
    fn into_remote_object(self, folder_id: &str) -> RemoteObject {
        RemoteObject {
            id: self.id,
            name: self.name,
            created_at: self.created_time,
            folder_id: folder_id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Where a resumable upload stands after a request
enum UploadStep {
    Done(DriveFile),
    /// The server has committed every byte before this offset
    Resume(u64),
}

/// Google Drive client bound to one service account
pub struct DriveClient {
    http: Client,
    key: ServiceAccountKey,
    token: Mutex<Option<CachedToken>>,
    chunk_size: u64,
}

impl DriveClient {
    /// Create a client; `chunk_size_kb` is rounded up to the API's 256 KiB granularity
    pub fn new(key: ServiceAccountKey, chunk_size_kb: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            // Resumable uploads answer 308 without a Location header
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            key,
            token: Mutex::new(None),
            chunk_size: aligned_chunk_size(chunk_size_kb),
        })
    }

    /// Create a client from a service-account key file
    pub fn from_key_file(path: &Path, chunk_size_kb: u64) -> Result<Self> {
        Self::new(ServiceAccountKey::from_file(path)?, chunk_size_kb)
    }

    /// Get a valid access token, exchanging a fresh assertion when needed
    fn access_token(&self) -> Result<String> {
        let mut cached = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("Token cache lock poisoned"))?;

        let now = Utc::now();
        if let Some(ref token) = *cached {
            if token.expires_at - ChronoDuration::seconds(TOKEN_EXPIRY_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting access token for {}", self.key.client_email);
        let assertion = sign_assertion(&self.key, now.timestamp())?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .context("Failed to reach token endpoint")?;
        let token: TokenResponse = ensure_success(response, "Token exchange")?
            .json()
            .context("Failed to parse token response")?;

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + ChronoDuration::seconds(token.expires_in),
        });
        Ok(value)
    }

    /// Start a resumable upload session and return its URI
    fn start_session(&self, folder_id: &str, name: &str, total: u64) -> Result<String> {
        let token = self.access_token()?;
        let metadata = serde_json::json!({
            "name": name,
            "parents": [folder_id],
        });

        let response = self
            .http
            .post(UPLOAD_URL)
            .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "application/octet-stream")
            .header("X-Upload-Content-Length", total.to_string())
            .json(&metadata)
            .send()
            .context("Failed to start upload session")?;
        let response = ensure_success(response, "Upload session start")?;

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .context("Upload session response has no Location header")
    }

    /// Send the chunk starting at `offset`
    fn send_chunk(&self, session: &str, file: &mut File, offset: u64, total: u64) -> Result<UploadStep> {
        let len = self.chunk_size.min(total - offset);
        let mut buffer = vec![0u8; len as usize];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;

        let response = self
            .http
            .put(session)
            .header(CONTENT_LENGTH, len)
            .header(CONTENT_RANGE, content_range(offset, len, total))
            .body(buffer)
            .send()
            .context("Chunk transfer failed")?;

        interpret_upload_response(response)
    }

    /// Ask the server how much of the upload it has committed
    fn query_session(&self, session: &str, total: u64) -> Result<UploadStep> {
        let response = self
            .http
            .put(session)
            .header(CONTENT_LENGTH, 0)
            .header(CONTENT_RANGE, format!("bytes */{}", total))
            .send()
            .context("Upload status query failed")?;

        interpret_upload_response(response)
    }
}

/// An open resumable upload
trait ChunkSession {
    /// Send the chunk starting at `offset`
    fn send_chunk(&mut self, offset: u64) -> Result<UploadStep>;
    /// Ask the server how far the upload got
    fn query(&mut self) -> Result<UploadStep>;
}

struct DriveSession<'a> {
    client: &'a DriveClient,
    uri: String,
    file: File,
    total: u64,
}

impl ChunkSession for DriveSession<'_> {
    fn send_chunk(&mut self, offset: u64) -> Result<UploadStep> {
        if offset >= self.total {
            return self.query();
        }
        self.client.send_chunk(&self.uri, &mut self.file, offset, self.total)
    }

    fn query(&mut self) -> Result<UploadStep> {
        self.client.query_session(&self.uri, self.total)
    }
}

/// Push chunks through `session` until the server reports the file complete
///
/// A failed chunk or a response without progress costs one attempt at the
/// current offset; any progress restores the full budget.
fn drive_session(
    session: &mut dyn ChunkSession,
    name: &str,
    total: u64,
    base_delay: Duration,
) -> Result<DriveFile> {
    let mut offset = 0;
    let mut attempts = 0;
    loop {
        let (step, after_failure) = match session.send_chunk(offset) {
            Ok(step) => (step, false),
            Err(e) => {
                attempts += 1;
                if attempts >= MAX_CHUNK_ATTEMPTS {
                    return Err(e.context(format!(
                        "Giving up on {} at offset {} after {} attempts",
                        name, offset, attempts
                    )));
                }
                warn!("Chunk at offset {} failed (attempt {}): {:#}", offset, attempts, e);
                std::thread::sleep(base_delay * (1 << attempts));
                match session.query() {
                    Ok(step) => (step, true),
                    Err(query_err) => {
                        warn!("Could not query upload status: {:#}", query_err);
                        continue;
                    }
                }
            }
        };

        match step {
            UploadStep::Done(uploaded) => return Ok(uploaded),
            UploadStep::Resume(next) if next > offset => {
                debug!("Server committed {} of {} bytes", next, total);
                attempts = 0;
                offset = next.min(total);
            }
            // The failure was already counted
            UploadStep::Resume(_) if after_failure => {}
            UploadStep::Resume(next) => {
                attempts += 1;
                if attempts >= MAX_CHUNK_ATTEMPTS {
                    anyhow::bail!("Upload of {} stalled at {} of {} bytes", name, next, total);
                }
            }
        }
    }
}

/// 200/201 finish the upload, 308 reports the committed range
fn interpret_upload_response(response: Response) -> Result<UploadStep> {
    match response.status() {
        StatusCode::OK | StatusCode::CREATED => {
            let file: DriveFile = response.json().context("Failed to parse uploaded file")?;
            Ok(UploadStep::Done(file))
        }
        StatusCode::PERMANENT_REDIRECT => {
            let next = response
                .headers()
                .get(RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_range_end)
                .map_or(0, |end| end + 1);
            Ok(UploadStep::Resume(next))
        }
        _ => {
            let response = ensure_success(response, "Chunk upload")?;
            anyhow::bail!("Unexpected upload response status {}", response.status())
        }
    }
}

impl RemoteStore for DriveClient {
    fn list_objects(&self, folder_id: &str) -> Result<Vec<RemoteObject>> {
        let query = folder_query(folder_id);
        let fields = format!("nextPageToken,files({})", FILE_FIELDS);
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.access_token()?;
            let mut request = self
                .http
                .get(FILES_URL)
                .bearer_auth(token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", fields.as_str()),
                    ("orderBy", "createdTime desc"),
                    ("pageSize", "1000"),
                ]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let response = request.send().context("Failed to list folder")?;
            let list: FileList = ensure_success(response, "Folder listing")?
                .json()
                .context("Failed to parse folder listing")?;

            objects.extend(list.files.into_iter().map(|f| f.into_remote_object(folder_id)));

            match list.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!("Folder {} holds {} object(s)", folder_id, objects.len());
        Ok(objects)
    }

    fn upload(&self, folder_id: &str, local_path: &Path) -> Result<RemoteObject> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("Upload path has no file name: {:?}", local_path))?;
        let file =
            File::open(local_path).with_context(|| format!("Failed to open {:?}", local_path))?;
        let total = file.metadata()?.len();

        info!("Uploading {} ({} bytes) to folder {}", name, total, folder_id);
        let session = self.start_session(folder_id, &name, total)?;

        if total == 0 {
            return match self.query_session(&session, 0)? {
                UploadStep::Done(uploaded) => Ok(uploaded.into_remote_object(folder_id)),
                UploadStep::Resume(_) => anyhow::bail!("Empty upload was not finalized"),
            };
        }

        let mut session = DriveSession {
            client: self,
            uri: session,
            file,
            total,
        };
        let uploaded = drive_session(&mut session, &name, total, RETRY_BASE_DELAY)?;
        info!("Uploaded {} as {}", uploaded.name, uploaded.id);
        Ok(uploaded.into_remote_object(folder_id))
    }

    fn delete(&self, object_id: &str) -> Result<DeleteOutcome> {
        let token = self.access_token()?;
        let response = self
            .http
            .delete(format!("{}/{}", FILES_URL, object_id))
            .bearer_auth(token)
            .send()
            .context("Failed to send delete request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        ensure_success(response, "Delete")?;
        Ok(DeleteOutcome::Deleted)
    }
}

fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    anyhow::bail!("{} failed with status {}: {}", action, status, body)
}

/// Drive search query for the live children of a folder
fn folder_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents and trashed = false", escaped)
}

fn aligned_chunk_size(chunk_size_kb: u64) -> u64 {
    let bytes = chunk_size_kb.saturating_mul(1024);
    bytes.div_ceil(CHUNK_GRANULARITY).max(1) * CHUNK_GRANULARITY
}

fn content_range(offset: u64, len: u64, total: u64) -> String {
    format!("bytes {}-{}/{}", offset, offset + len - 1, total)
}

/// Parse the end of a `Range: bytes=0-N` header
fn parse_range_end(header: &str) -> Option<u64> {
    header
        .trim()
        .strip_prefix("bytes=")?
        .split_once('-')?
        .1
        .parse()
        .ok()
}
