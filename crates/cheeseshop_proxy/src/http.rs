//! reqwest-backed transport for a PyPI-compatible upstream.

use crate::simple::SimpleIndexParser;
use crate::xmlrpc::{self, Value};
use crate::{IndexTransport, ListingMode, ProxyConfig};
use async_trait::async_trait;
use cheeseshop_core::{ReleaseData, ReleaseFile, ReleaseInfo, SearchHit, SearchQuery};
use cheeseshop_error::{
    CheeseshopError, CheeseshopResult, ConfigError, HttpError, JsonError, NotFoundError,
    NotFoundErrorKind, TaskError, UpstreamError, UpstreamErrorKind,
};
use cheeseshop_storage::BytesPayload;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::io::StreamReader;
use tracing::{debug, info, instrument};
use url::Url;

/// Talks XML-RPC and JSON to the upstream index over HTTP.
///
/// At most `connection_limit` requests are in flight at once.
#[derive(Debug)]
pub struct HttpIndexTransport {
    client: reqwest::Client,
    base: Url,
    rpc_url: Url,
    listing: ListingMode,
    simple_list_path: String,
    permits: Semaphore,
}

impl HttpIndexTransport {
    /// Build a transport from the `[proxy]` section.
    pub fn new(config: &ProxyConfig) -> CheeseshopResult<Self> {
        let base = Url::parse(config.url())
            .map_err(|e| ConfigError::new(format!("Invalid proxy url '{}': {}", config.url(), e)))?;
        let rpc_url = join(&base, "pypi")?;

        // Bodies stream for as long as they keep making progress, so only
        // connecting and each individual read are bounded.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .read_timeout(config.timeout())
            .pool_max_idle_per_host(*config.connection_limit())
            .user_agent(concat!("cheeseshop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            rpc_url,
            listing: *config.listing(),
            simple_list_path: config.simple_list_path().clone(),
            permits: Semaphore::new((*config.connection_limit()).max(1)),
        })
    }

    /// Upstream index root.
    pub fn base(&self) -> &Url {
        &self.base
    }

    async fn permit(&self) -> CheeseshopResult<SemaphorePermit<'_>> {
        self.permits
            .acquire()
            .await
            .map_err(|e| TaskError::new(format!("Connection pool closed: {}", e)).into())
    }

    #[instrument(skip(self, params))]
    async fn call(&self, method: &str, params: &[Value]) -> CheeseshopResult<Value> {
        let _permit = self.permit().await?;
        let response = self
            .client
            .post(self.rpc_url.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(xmlrpc::encode_call(method, params))
            .send()
            .await
            .map_err(transport_error)?;
        let body = check_status(response)?
            .text()
            .await
            .map_err(transport_error)?;
        xmlrpc::decode_response(&body)
    }

    #[instrument(skip(self))]
    async fn list_simple(&self) -> CheeseshopResult<Vec<String>> {
        let url = join(&self.base, self.simple_list_path.trim_start_matches('/'))?;
        let _permit = self.permit().await?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        let body = check_status(response)?
            .bytes_stream()
            .map_err(std::io::Error::other);

        let mut lines = StreamReader::new(body).lines();
        let mut parser = SimpleIndexParser::new();
        let mut names = Vec::new();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| HttpError::new(format!("Reading simple index: {}", e)))?
        {
            names.extend(parser.feed(&line).into_iter().map(|link| link.name().clone()));
        }
        info!(packages = names.len(), "Read simple index");
        Ok(names)
    }
}

#[async_trait]
impl IndexTransport for HttpIndexTransport {
    async fn list_packages(&self) -> CheeseshopResult<Vec<String>> {
        match self.listing {
            ListingMode::Xmlrpc => self.call("list_packages", &[]).await?.into_strings(),
            ListingMode::Simple => self.list_simple().await,
        }
    }

    async fn package_releases(
        &self,
        name: &str,
        show_hidden: bool,
    ) -> CheeseshopResult<Vec<String>> {
        self.call(
            "package_releases",
            &[Value::from(name), Value::from(show_hidden)],
        )
        .await?
        .into_strings()
    }

    #[instrument(skip(self))]
    async fn release_data(&self, name: &str, version: &str) -> CheeseshopResult<ReleaseData> {
        let mut url = self.rpc_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigError::new(format!("Proxy url {} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend([name, version, "json"]);
        debug!(%url, "Gathering release info");

        let _permit = self.permit().await?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(NotFoundError::new(NotFoundErrorKind::Release {
                name: name.to_string(),
                version: version.to_string(),
            })
            .into());
        }
        let body = check_status(response)?
            .bytes()
            .await
            .map_err(transport_error)?;
        let document: JsonRelease = serde_json::from_slice(&body)
            .map_err(|e| JsonError::new(format!("Release {} {}: {}", name, version, e)))?;
        document.into_release_data()
    }

    async fn search(&self, query: &SearchQuery) -> CheeseshopResult<Vec<SearchHit>> {
        let criteria = BTreeMap::from([
            ("name".to_string(), Value::from(query.names.clone())),
            ("description".to_string(), Value::from(query.descriptions.clone())),
        ]);
        let result = self
            .call(
                "search",
                &[Value::Struct(criteria), Value::from(query.operator.to_string())],
            )
            .await?;
        search_hits(result)
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> CheeseshopResult<BytesPayload> {
        let url = Url::parse(url).map_err(|e| {
            UpstreamError::new(UpstreamErrorKind::Protocol(format!(
                "Invalid download url '{}': {}",
                url, e
            )))
        })?;
        let response = {
            let _permit = self.permit().await?;
            self.client
                .get(url)
                .send()
                .await
                .map_err(transport_error)?
        };
        let response = check_status(response)?;
        if response.content_length().is_some() {
            BytesPayload::from_response(response)
        } else {
            // Chunked bodies have no declared size; buffer them.
            let body = response.bytes().await.map_err(transport_error)?;
            Ok(BytesPayload::from_bytes(body))
        }
    }
}

fn join(base: &Url, path: &str) -> CheeseshopResult<Url> {
    let mut root = base.clone();
    if !root.path().ends_with('/') {
        root.set_path(&format!("{}/", root.path()));
    }
    root.join(path)
        .map_err(|e| ConfigError::new(format!("Invalid path '{}': {}", path, e)).into())
}

fn transport_error(err: reqwest::Error) -> CheeseshopError {
    match err.status() {
        Some(status) => HttpError::with_status(status.as_u16(), err.to_string()).into(),
        None => HttpError::new(err.to_string()).into(),
    }
}

fn check_status(response: reqwest::Response) -> CheeseshopResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(UpstreamError::new(UpstreamErrorKind::Status(status.as_u16())).into())
    }
}

fn search_hits(result: Value) -> CheeseshopResult<Vec<SearchHit>> {
    let Value::Array(items) = result else {
        return Err(UpstreamError::new(UpstreamErrorKind::Protocol(
            "search result is not an array".to_string(),
        ))
        .into());
    };

    Ok(items
        .iter()
        .filter_map(Value::as_struct)
        .filter_map(|hit| {
            let name = hit.get("name").and_then(Value::as_str)?;
            let version = hit.get("version").and_then(Value::as_str).unwrap_or_default();
            let summary = hit
                .get("summary")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(SearchHit::new(name, version, summary))
        })
        .collect())
}

/// `/pypi/<name>/<version>/json` document.
#[derive(Debug, Deserialize)]
struct JsonRelease {
    info: ReleaseInfo,
    #[serde(default)]
    urls: Vec<JsonFile>,
}

#[derive(Debug, Deserialize)]
struct JsonFile {
    filename: String,
    url: String,
    #[serde(default)]
    md5_digest: Option<String>,
    #[serde(default)]
    digests: JsonDigests,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    packagetype: Option<String>,
    #[serde(default)]
    comment_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonDigests {
    #[serde(default)]
    md5: Option<String>,
    #[serde(default)]
    sha256: Option<String>,
}

impl JsonRelease {
    fn into_release_data(self) -> CheeseshopResult<ReleaseData> {
        let files = self
            .urls
            .into_iter()
            .map(|file| {
                cheeseshop_core::ReleaseFileBuilder::default()
                    .filename(file.filename)
                    .url(file.url)
                    .md5_digest(file.md5_digest.or(file.digests.md5))
                    .sha256_digest(file.digests.sha256)
                    .size(file.size)
                    .packagetype(file.packagetype)
                    .comment_text(file.comment_text)
                    .build()
                    .map_err(|e| CheeseshopError::from(JsonError::new(format!("Invalid file entry: {}", e))))
            })
            .collect::<CheeseshopResult<Vec<ReleaseFile>>>()?;

        Ok(ReleaseData {
            info: self.info,
            files,
        })
    }
}
