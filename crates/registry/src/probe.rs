//! Manifest existence checks over the registry HTTP API (v2).
//!
//! The probe asks one question: does `image:tag` exist? It issues
//! `GET /v2/<repository>/manifests/<tag>` with the manifest-list and OCI
//! index media types accepted. Registries that demand a token (GHCR, Docker
//! Hub) answer 401 with a `WWW-Authenticate: Bearer` challenge; the probe
//! follows it once for an anonymous pull token and retries. 200 means the
//! reference exists, 404 means it does not, anything else is an error.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use tagpin_core::{ProbeError, RegistryProbe};

use crate::image::ImageRef;

const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json, \
   application/vnd.docker.distribution.manifest.list.v2+json, \
   application/vnd.oci.image.manifest.v1+json, \
   application/vnd.oci.image.index.v1+json";

/// [`RegistryProbe`] backed by the registry HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
  client: reqwest::Client,
  /// When set, every repository is probed against this base URL instead of
  /// the host parsed from the image reference. Test seam.
  base_url: Option<String>,
}

impl Default for HttpRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl HttpRegistry {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: None,
    }
  }

  /// Probe against a fixed base URL (e.g. a mock server).
  pub fn with_base_url(base_url: impl Into<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: Some(base_url.into()),
    }
  }

  fn manifest_url(&self, image: &ImageRef, tag: &str) -> String {
    let base = match &self.base_url {
      Some(base) => base.trim_end_matches('/').to_string(),
      None => format!("https://{}", image.registry),
    };
    format!("{base}/v2/{}/manifests/{tag}", image.repository)
  }

  async fn fetch_manifest(
    &self,
    url: &str,
    token: Option<&str>,
  ) -> Result<reqwest::Response, reqwest::Error> {
    let mut request = self.client.get(url).header("Accept", MANIFEST_ACCEPT);
    if let Some(token) = token {
      request = request.bearer_auth(token);
    }
    request.send().await
  }

  /// Follow a `WWW-Authenticate: Bearer` challenge for an anonymous token.
  async fn anonymous_token(
    &self,
    image: &str,
    challenge: &str,
  ) -> Result<String, ProbeError> {
    let challenge = BearerChallenge::parse(challenge).ok_or_else(|| ProbeError::Query {
      image: image.to_string(),
      message: format!("unsupported auth challenge: {challenge}"),
    })?;

    let mut request = self.client.get(&challenge.realm);
    if let Some(service) = &challenge.service {
      request = request.query(&[("service", service)]);
    }
    if let Some(scope) = &challenge.scope {
      request = request.query(&[("scope", scope)]);
    }

    let response = request.send().await.map_err(|e| query_error(image, &e))?;
    if !response.status().is_success() {
      return Err(ProbeError::Query {
        image: image.to_string(),
        message: format!("token endpoint returned {}", response.status()),
      });
    }

    let token: TokenResponse = response.json().await.map_err(|e| query_error(image, &e))?;
    token
      .token
      .or(token.access_token)
      .ok_or_else(|| ProbeError::Query {
        image: image.to_string(),
        message: "token endpoint returned no token".to_string(),
      })
  }
}

#[async_trait]
impl RegistryProbe for HttpRegistry {
  async fn manifest_exists(&self, image: &str, tag: &str) -> Result<bool, ProbeError> {
    let parsed = ImageRef::parse(image).map_err(|_| ProbeError::InvalidReference {
      image: image.to_string(),
    })?;
    let url = self.manifest_url(&parsed, tag);
    debug!(%url, "probing manifest");

    let mut response = self
      .fetch_manifest(&url, None)
      .await
      .map_err(|e| query_error(image, &e))?;

    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
      let challenge = response
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
      let token = self.anonymous_token(image, &challenge).await?;
      response = self
        .fetch_manifest(&url, Some(&token))
        .await
        .map_err(|e| query_error(image, &e))?;
    }

    match response.status() {
      status if status.is_success() => Ok(true),
      reqwest::StatusCode::NOT_FOUND => Ok(false),
      status => Err(ProbeError::Query {
        image: image.to_string(),
        message: format!("registry returned {status} for {url}"),
      }),
    }
  }
}

fn query_error(image: &str, err: &reqwest::Error) -> ProbeError {
  ProbeError::Query {
    image: image.to_string(),
    message: err.to_string(),
  }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  token: Option<String>,
  access_token: Option<String>,
}

/// Parsed `Bearer realm="...",service="...",scope="..."` challenge.
#[derive(Debug, PartialEq, Eq)]
struct BearerChallenge {
  realm: String,
  service: Option<String>,
  scope: Option<String>,
}

impl BearerChallenge {
  fn parse(header: &str) -> Option<Self> {
    let params = header.strip_prefix("Bearer ")?;

    let mut realm = None;
    let mut service = None;
    let mut scope = None;
    for param in params.split(',') {
      let (key, value) = param.trim().split_once('=')?;
      let value = value.trim_matches('"').to_string();
      match key {
        "realm" => realm = Some(value),
        "service" => service = Some(value),
        "scope" => scope = Some(value),
        _ => {}
      }
    }

    Some(Self {
      realm: realm?,
      service,
      scope,
    })
  }
}
