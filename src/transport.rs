// HTTP transport used by the upload pipeline.
//
// `Transport` is the seam between the protocol logic in `api` and the
// network. `HttpTransport` is the real implementation on top of a blocking
// reqwest client; tests substitute a scripted one.

use crate::buffer::ResponseBuffer;
use crate::error::{Error, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Certificate;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time allowed to establish a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// Size of each read from the response body.
const CHUNK_SIZE: usize = 5000;

/// A POST request as the pipeline describes it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        HttpRequest { url: url.into(), headers: Vec::new(), body: Vec::new() }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Look up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Result of one completed HTTP exchange. Each buffer is fresh for the call.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: u16,
    /// Status line and header lines, `\r\n` terminated, as text.
    pub head: ResponseBuffer,
    pub body: ResponseBuffer,
}

impl Exchange {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can perform a POST and hand back the raw response.
pub trait Transport {
    fn post(&self, request: HttpRequest) -> Result<Exchange>;
}

/// Options for building an `HttpTransport`.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    /// PEM bundle used as the only trust root when set.
    pub ca_bundle: Option<PathBuf>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        TransportOptions { connect_timeout: DEFAULT_CONNECT_TIMEOUT, ca_bundle: None }
    }
}

/// Blocking reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build the client: short connect timeout, no overall timeout so large
    /// uploads and slow generations are not cut off.
    pub fn new(options: &TransportOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(None::<Duration>)
            .tcp_nodelay(true);

        if let Some(path) = &options.ca_bundle {
            let certs = load_ca_bundle(path)?;
            debug!("pinning {} CA certificate(s) from {}", certs.len(), path.display());
            builder = builder.tls_built_in_root_certs(false);
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder.build().map_err(Error::network)?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn post(&self, request: HttpRequest) -> Result<Exchange> {
        let headers = header_map(&request.headers)?;
        let mut response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .map_err(Error::network)?;

        let mut head = ResponseBuffer::new();
        head.append(format!("{:?} {}\r\n", response.version(), response.status()).as_bytes())?;
        for (name, value) in response.headers() {
            head.append(name.as_str().as_bytes())?;
            head.append(b": ")?;
            head.append(value.as_bytes())?;
            head.append(b"\r\n")?;
        }
        head.append(b"\r\n")?;

        let mut body = ResponseBuffer::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match response.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => body.append(&chunk[..n])?,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::network(e)),
            }
        }

        Ok(Exchange { status: response.status().as_u16(), head, body })
    }
}

fn header_map(headers: &[(&'static str, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader(name.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Read every certificate from a PEM bundle. A missing file, an encoding
/// error anywhere in the bundle, or a bundle with no certificate at all is
/// a transport failure.
fn load_ca_bundle(path: &Path) -> Result<Vec<Certificate>> {
    let pem = std::fs::read(path).map_err(Error::network)?;
    let certs = Certificate::from_pem_bundle(&pem).map_err(Error::network)?;
    if certs.is_empty() {
        return Err(Error::network(format!("no certificates found in {}", path.display())));
    }
    Ok(certs)
}
