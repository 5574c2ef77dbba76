use url::Url;

use crate::error::RemoteError;

/// Derives the service base URL from a bearer token. Injectable so tests can
/// point the client at a local stub server without depending on the token's
/// real structure.
pub trait BaseUrlResolver: Send + Sync {
    fn resolve(&self, bearer_token: &str) -> Result<Url, RemoteError>;
}

/// Default resolver: tokens are `"{region}.{opaque payload}"`; the region
/// segment selects a subdomain of the production API host.
pub struct TokenRegionResolver {
    pub host_template: String,
}

impl Default for TokenRegionResolver {
    fn default() -> Self {
        Self {
            host_template: "https://{region}.index.example.com".to_string(),
        }
    }
}

impl BaseUrlResolver for TokenRegionResolver {
    fn resolve(&self, bearer_token: &str) -> Result<Url, RemoteError> {
        let region = match bearer_token.split_once('.') {
            Some((region, _)) if !region.is_empty() => region,
            _ => "us",
        };
        let url_str = self.host_template.replace("{region}", region);
        Url::parse(&url_str).map_err(|e| RemoteError::BaseUrl(e.to_string()))
    }
}

/// Resolves to a fixed URL regardless of token, for tests and for hosts that
/// already know their endpoint.
pub struct FixedUrlResolver(pub Url);

impl BaseUrlResolver for FixedUrlResolver {
    fn resolve(&self, _bearer_token: &str) -> Result<Url, RemoteError> {
        Ok(self.0.clone())
    }
}
