// API client module: drives the Gemini resumable upload and the
// generation request that follows it.
//
// One turn is three POSTs, each depending on the previous one:
//   1. initiate  -> session URL (read from the response headers)
//   2. upload    -> file URI    (read from the JSON body)
//   3. generate  -> answer text (read from the JSON body)
// A failure anywhere ends the turn; nothing is retried.

use crate::busy::{BusyIndicator, QuietSink, TickSink};
use crate::codec;
use crate::config::Endpoints;
use crate::error::{Error, Result};
use crate::headers::extract_upload_url;
use crate::mime::MimeType;
use crate::transport::{Exchange, HttpRequest, Transport};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Display name declared when a session is opened.
pub const DISPLAY_NAME: &str = "IMAGE";

/// Where the client is in the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Initiating,
    Uploading,
    Generating,
    Done,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Initiating => "initiating upload",
            Phase::Uploading => "uploading",
            Phase::Generating => "generating",
            Phase::Done => "done",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// How the file reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadMode {
    /// Resumable upload to the file service, then reference by URI.
    #[default]
    Resumable,
    /// Send the bytes base64-encoded inside the generation request.
    Inline,
}

/// A file read from disk together with its resolved type.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    pub mime_type: MimeType,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    /// Resolve the MIME type first so unsupported files are never read.
    pub fn read(path: &Path) -> Result<Self> {
        let mime_type = MimeType::from_path(path)?;
        let bytes = std::fs::read(path)?;
        Ok(LocalFile { path: path.to_path_buf(), mime_type, bytes })
    }
}

/// State handed from the initiate step to the upload step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub upload_url: String,
    pub content_length: u64,
    pub mime_type: MimeType,
    pub api_key: String,
}

/// Remote identifier of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub uri: String,
}

/// The file part of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Uploaded { mime_type: MimeType, file_uri: String },
    Inline { mime_type: MimeType, data: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub attachment: Attachment,
    pub prompt_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
}

// Wire shapes for the generation endpoint.
#[derive(Serialize)]
struct GenerateBody<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Part<'a> {
    FileData { mime_type: &'a str, file_uri: &'a str },
    InlineData { mime_type: &'a str, data: &'a str },
    Text(&'a str),
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Deserialize)]
struct UploadedFile {
    uri: String,
}

impl GenerationRequest {
    fn to_json(&self) -> Result<Vec<u8>> {
        let file_part = match &self.attachment {
            Attachment::Uploaded { mime_type, file_uri } => {
                Part::FileData { mime_type: mime_type.as_str(), file_uri: file_uri.as_str() }
            }
            Attachment::Inline { mime_type, data } => {
                Part::InlineData { mime_type: mime_type.as_str(), data: data.as_str() }
            }
        };
        let body = GenerateBody { contents: [Content { parts: [file_part, Part::Text(&self.prompt_text)] }] };
        serde_json::to_vec(&body).map_err(|e| Error::MalformedResponse(format!("encoding generation request: {}", e)))
    }
}

/// Client for one configured Gemini endpoint pair.
///
/// The transport is generic so the protocol logic can run against a
/// scripted transport in tests.
pub struct GeminiClient<T: Transport> {
    transport: T,
    endpoints: Endpoints,
    phase: Phase,
    failed_in: Option<Phase>,
    busy: Arc<AtomicBool>,
    busy_sink: Box<dyn Fn() -> Box<dyn TickSink>>,
}

impl<T: Transport> GeminiClient<T> {
    pub fn new(transport: T, endpoints: Endpoints) -> Self {
        GeminiClient {
            transport,
            endpoints,
            phase: Phase::Idle,
            failed_in: None,
            busy: Arc::new(AtomicBool::new(false)),
            busy_sink: Box::new(|| Box::new(QuietSink) as Box<dyn TickSink>),
        }
    }

    /// Choose where the "thinking" indicator draws during generation.
    pub fn with_busy_sink<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TickSink> + 'static,
    {
        self.busy_sink = Box::new(factory);
        self
    }

    /// Replace the endpoints, e.g. after the configuration was re-read.
    pub fn set_endpoints(&mut self, endpoints: Endpoints) {
        self.endpoints = endpoints;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The step that ended the current turn, if one failed.
    pub fn failed_in(&self) -> Option<Phase> {
        self.failed_in
    }

    /// Back to `Idle` with no recorded failure, ready for a new turn.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.failed_in = None;
    }

    /// Flag shared with the busy indicator; `true` only while generating.
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run a full turn: upload the file (unless inlined) and ask `prompt`
    /// about it.
    pub fn run_turn(&mut self, file: &LocalFile, prompt: &str, mode: UploadMode) -> Result<GenerationResult> {
        self.reset();
        let attachment = match mode {
            UploadMode::Resumable => {
                let session = self.initiate(file.bytes.len() as u64, file.mime_type)?;
                let handle = self.upload(session, &file.bytes)?;
                Attachment::Uploaded { mime_type: file.mime_type, file_uri: handle.uri }
            }
            UploadMode::Inline => Attachment::Inline { mime_type: file.mime_type, data: codec::encode(&file.bytes) },
        };
        self.generate(&GenerationRequest { attachment, prompt_text: prompt.to_string() })
    }

    /// Open a resumable upload session for `content_length` bytes.
    pub fn initiate(&mut self, content_length: u64, mime_type: MimeType) -> Result<UploadSession> {
        self.step(Phase::Initiating, |client| {
            let api_key = client.endpoints.api_key.clone();
            let body = json!({ "file": { "display_name": DISPLAY_NAME } }).to_string();
            let request = HttpRequest::post(&client.endpoints.file_url)
                .header("x-goog-api-key", &api_key)
                .header("X-Goog-Upload-Protocol", "resumable")
                .header("X-Goog-Upload-Command", "start")
                .header("X-Goog-Upload-Header-Content-Length", content_length.to_string())
                .header("X-Goog-Upload-Header-Content-Type", mime_type.as_str())
                .header("Content-Type", "application/json")
                .body(body.into_bytes());

            let exchange = client.transport.post(request)?;
            ensure_success(&exchange)?;

            let head = exchange.head.to_text();
            let upload_url = extract_upload_url(&head).ok_or(Error::UploadUrlMissing)?.to_string();
            debug!("upload session opened for {} bytes of {}", content_length, mime_type);
            Ok(UploadSession { upload_url, content_length, mime_type, api_key })
        })
    }

    /// Send the bytes to the session URL and finalize the upload.
    pub fn upload(&mut self, session: UploadSession, bytes: &[u8]) -> Result<FileHandle> {
        self.step(Phase::Uploading, |client| {
            let request = HttpRequest::post(session.upload_url)
                .header("x-goog-api-key", session.api_key)
                .header("Content-Length", session.content_length.to_string())
                .header("X-Goog-Upload-Offset", "0")
                .header("X-Goog-Upload-Command", "upload, finalize")
                .header("Content-Type", session.mime_type.as_str())
                .body(bytes.to_vec());

            let exchange = client.transport.post(request)?;
            ensure_success(&exchange)?;

            let response: UploadResponse =
                serde_json::from_slice(exchange.body.as_bytes()).map_err(|_| Error::FileUriMissing)?;
            if response.file.uri.is_empty() {
                return Err(Error::FileUriMissing);
            }
            info!("uploaded {} bytes as {}", session.content_length, response.file.uri);
            Ok(FileHandle { uri: response.file.uri })
        })
    }

    /// Ask the model about the attachment. The busy indicator runs for the
    /// duration of the request.
    pub fn generate(&mut self, request: &GenerationRequest) -> Result<GenerationResult> {
        let result = self.step(Phase::Generating, |client| {
            let http = HttpRequest::post(&client.endpoints.generate_url)
                .header("x-goog-api-key", &client.endpoints.api_key)
                .header("Content-Type", "application/json")
                .body(request.to_json()?);

            let indicator = BusyIndicator::start(Arc::clone(&client.busy), (client.busy_sink)());
            let outcome = client.transport.post(http);
            indicator.stop();

            let exchange = outcome?;
            ensure_success(&exchange)?;
            let text = answer_text(exchange.body.as_bytes())?;
            Ok(GenerationResult { text: normalize_escapes(&text) })
        })?;
        self.phase = Phase::Done;
        Ok(result)
    }

    fn step<R, F>(&mut self, phase: Phase, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self) -> Result<R>,
    {
        debug!("{} -> {}", self.phase, phase);
        self.phase = phase;
        let outcome = f(self);
        if let Err(e) = &outcome {
            debug!("{} failed: {}", phase, e);
            self.phase = Phase::Error;
            self.failed_in = Some(phase);
        }
        outcome
    }
}

/// Rewrite each literal `\033` (four characters) into the ESC byte.
pub fn normalize_escapes(text: &str) -> String {
    text.replace("\\033", "\x1b")
}

fn ensure_success(exchange: &Exchange) -> Result<()> {
    if exchange.is_success() {
        return Ok(());
    }
    let body = error_message(exchange.body.as_bytes());
    warn!("request failed with status {}", exchange.status);
    Err(Error::UnexpectedStatus { status: exchange.status, body })
}

/// Prefer the API's `error.message`; fall back to the raw body text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

/// Extract `candidates[0].content.parts[0].text`.
fn answer_text(body: &[u8]) -> Result<String> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| Error::MalformedResponse(format!("invalid JSON: {}", e)))?;
    value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedResponse("no text in candidates[0].content.parts[0]".into()))
}
