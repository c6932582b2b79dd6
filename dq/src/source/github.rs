//! GitHub repository source
//!
//! Walks a repository path through the REST contents API, depth-first in
//! listing order, keeping files whose name matches the extension filter.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{Document, DocumentSource, SourceError};
use crate::config::GithubConfig;
use crate::error::{Error, Result};

const USER_AGENT: &str = "docsqueeze";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw+json";
const API_VERSION: &str = "2022-11-28";

/// Repository coordinates parsed from a github.com URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubLocation {
    pub owner: String,
    pub repo: String,
    /// Branch, tag or commit; `None` means the default branch
    pub reference: Option<String>,
    /// Path inside the repository, empty for the root
    pub path: String,
}

impl GithubLocation {
    /// Parse `https://github.com/{owner}/{repo}[/tree|blob/{ref}/{path...}]`
    pub fn parse(input: &str) -> Result<Self, SourceError> {
        debug!(%input, "GithubLocation::parse: called");
        let invalid = |reason: &str| SourceError::InvalidUrl {
            url: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
        match url.host_str() {
            Some("github.com") | Some("www.github.com") => {}
            _ => return Err(invalid("not a github.com URL")),
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let (owner, repo) = match segments.as_slice() {
            [owner, repo, ..] => (owner.to_string(), repo.trim_end_matches(".git").to_string()),
            _ => return Err(invalid("expected /{owner}/{repo}")),
        };

        let (reference, path) = match segments.get(2) {
            None => (None, String::new()),
            Some(&"tree") | Some(&"blob") => match segments.get(3) {
                Some(reference) => (Some(reference.to_string()), segments[4..].join("/")),
                None => return Err(invalid("missing ref after tree/blob")),
            },
            Some(other) => return Err(invalid(&format!("unsupported path segment '{}'", other))),
        };

        Ok(Self {
            owner,
            repo,
            reference,
            path,
        })
    }
}

impl std::fmt::Display for GithubLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)?;
        if let Some(reference) = &self.reference {
            write!(f, "@{}", reference)?;
        }
        if !self.path.is_empty() {
            write!(f, ":{}", self.path)?;
        }
        Ok(())
    }
}

/// Documents under a path of a GitHub repository
pub struct GithubSource {
    location: GithubLocation,
    api_url: Url,
    token: Option<String>,
    extensions: Vec<String>,
    http: Client,
}

impl GithubSource {
    pub fn new(
        location: GithubLocation,
        api_url: &str,
        token: Option<String>,
        extensions: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let api_url = Url::parse(api_url).map_err(|e| SourceError::InvalidUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            location,
            api_url,
            token,
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            http,
        })
    }

    /// Build a source for `url`, reading the optional token once
    pub fn from_config(url: &str, config: &GithubConfig) -> Result<Self, SourceError> {
        debug!(%url, "GithubSource::from_config: called");
        let location = GithubLocation::parse(url)?;
        let token = config.token();
        debug!(authenticated = token.is_some(), "GithubSource::from_config: token resolved");
        Self::new(
            location,
            &config.api_url,
            token,
            config.extensions.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn location(&self) -> &GithubLocation {
        &self.location
    }

    fn matches_extension(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}?ref={ref}`
    fn contents_url(&self, path: &str) -> Result<Url, SourceError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl {
                url: self.api_url.to_string(),
                reason: "cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(["repos", self.location.owner.as_str(), self.location.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        if let Some(reference) = &self.location.reference {
            url.query_pairs_mut().append_pair("ref", reference);
        }
        Ok(url)
    }

    async fn get(&self, path: &str, accept: &str) -> Result<Response> {
        let url = self.contents_url(path)?;
        debug!(%url, %accept, "GithubSource::get: called");

        let mut request = self
            .http
            .get(url)
            .header("user-agent", USER_AGENT)
            .header("accept", accept)
            .header("x-github-api-version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(SourceError::Network)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::SourceNotFound(format!(
                "{}/{}:{}",
                self.location.owner, self.location.repo, path
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentSource for GithubSource {
    fn describe(&self) -> String {
        format!("github {}", self.location)
    }

    async fn list(&self) -> Result<Vec<String>> {
        debug!(location = %self.location, "GithubSource::list: called");
        let mut files = Vec::new();
        let mut pending = vec![Pending::Dir(self.location.path.clone())];

        while let Some(next) = pending.pop() {
            let dir = match next {
                Pending::File(path) => {
                    files.push(path);
                    continue;
                }
                Pending::Dir(dir) => dir,
            };

            let body = self.get(&dir, ACCEPT_JSON).await?.text().await.map_err(SourceError::Network)?;
            let contents: ContentsResponse = serde_json::from_str(&body)
                .map_err(|e| SourceError::UnexpectedResponse(format!("contents of '{}': {}", dir, e)))?;

            match contents {
                // an explicitly named file is taken as-is
                ContentsResponse::Single(entry) if entry.kind == "file" => files.push(entry.path),
                ContentsResponse::Single(entry) => {
                    debug!(path = %entry.path, kind = %entry.kind, "GithubSource::list: skipping non-file");
                }
                ContentsResponse::Listing(entries) => {
                    for entry in entries.into_iter().rev() {
                        match entry.kind.as_str() {
                            "dir" => pending.push(Pending::Dir(entry.path)),
                            "file" if self.matches_extension(&entry.name) => pending.push(Pending::File(entry.path)),
                            _ => {}
                        }
                    }
                }
            }
        }

        info!(count = files.len(), location = %self.location, "Listed repository documents");
        Ok(files)
    }

    async fn fetch(&self, id: &str) -> Result<Document> {
        debug!(%id, "GithubSource::fetch: called");
        let bytes = self.get(id, ACCEPT_RAW).await?.bytes().await.map_err(SourceError::Network)?;
        Document::from_bytes(id, bytes.to_vec())
    }
}

enum Pending {
    Dir(String),
    File(String),
}

// GitHub contents API response types

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentEntry>),
    Single(ContentEntry),
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}
