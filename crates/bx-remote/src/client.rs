use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use bx_index::{Chunk, ServerManifest};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use tracing::warn;
use url::Url;

use crate::base_url::{BaseUrlResolver, TokenRegionResolver};
use crate::error::RemoteError;
use crate::wire::{
    DeleteBranchRequest, DeleteFilesRequest, DeleteProjectRequest, ManifestResponse,
    SearchRequest, SearchResult, UpsertRequest,
};

/// Chunks per `upsert` call; the scanner is responsible for splitting larger
/// batches before calling in.
pub const UPSERT_BATCH_SIZE: usize = 60;

/// Stateless, shareable HTTP client for the remote index service's endpoints.
pub struct RemoteClient {
    base: Url,
    http: Client,
    bearer_token: String,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base", &self.base)
            .finish()
    }
}

impl Clone for RemoteClient {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            http: self.http.clone(),
            bearer_token: self.bearer_token.clone(),
        }
    }
}

impl RemoteClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(bearer_token: &str) -> Result<Self, RemoteError> {
        Self::with_resolver(bearer_token, &TokenRegionResolver::default())
    }

    pub fn with_resolver(
        bearer_token: &str,
        resolver: &dyn BaseUrlResolver,
    ) -> Result<Self, RemoteError> {
        let base = resolver.resolve(bearer_token)?;
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            base,
            http,
            bearer_token: bearer_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path)
            .map_err(|e| RemoteError::BaseUrl(e.to_string()))
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, RemoteError> {
        let url = self.url(path)?;
        let mut req = self
            .http
            .request(method, url)
            .bearer_auth(&self.bearer_token);
        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status().as_u16();
        let body_text = res.text().await.unwrap_or_default();
        Err(RemoteError::Remote {
            status,
            body: body_text,
        })
    }

    /// `PUT /api/codebase-indexing/upsert`. Retries with exponential backoff
    /// on transport failures and 5xx responses; 4xx surfaces immediately.
    pub async fn upsert(&self, chunks: Vec<Chunk>) -> Result<(), RemoteError> {
        debug_assert!(
            chunks.len() <= UPSERT_BATCH_SIZE,
            "caller must split batches to at most {UPSERT_BATCH_SIZE} chunks"
        );
        let body = UpsertRequest { chunks };

        (|| async {
            self.send(Method::PUT, "api/codebase-indexing/upsert", Some(&body))
                .await
        })
        .retry(
            &ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_factor(2.0)
                .with_max_times(3)
                .with_jitter(),
        )
        .when(|e: &RemoteError| e.should_retry())
        .notify(|e, dur| {
            warn!(
                "upsert failed, retrying after {:.2}s: {}",
                dur.as_secs_f64(),
                e
            );
        })
        .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn search(
        &self,
        query: &str,
        organization_id: &str,
        project_id: &str,
        prefer_branch: &str,
        fallback_branch: &str,
        exclude_files: Vec<String>,
        path: Option<String>,
    ) -> Result<Vec<SearchResult>, RemoteError> {
        let body = SearchRequest {
            query: query.to_string(),
            organization_id: organization_id.to_string(),
            project_id: project_id.to_string(),
            prefer_branch: prefer_branch.to_string(),
            fallback_branch: fallback_branch.to_string(),
            exclude_files,
            path,
        };
        let res = self
            .send(Method::POST, "api/codebase-indexing/search", Some(&body))
            .await?;
        res.json::<Vec<SearchResult>>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    pub async fn delete_files(
        &self,
        organization_id: &str,
        project_id: &str,
        git_branch: &str,
        file_paths: Vec<String>,
    ) -> Result<(), RemoteError> {
        let body = DeleteFilesRequest {
            organization_id: organization_id.to_string(),
            project_id: project_id.to_string(),
            git_branch: git_branch.to_string(),
            file_paths,
        };
        self.send(Method::DELETE, "api/codebase-indexing/files", Some(&body))
            .await?;
        Ok(())
    }

    pub async fn delete_branch(
        &self,
        organization_id: &str,
        project_id: &str,
        git_branch: &str,
    ) -> Result<(), RemoteError> {
        let body = DeleteBranchRequest {
            organization_id: organization_id.to_string(),
            project_id: project_id.to_string(),
            git_branch: git_branch.to_string(),
        };
        self.send(Method::DELETE, "api/codebase-indexing/branch", Some(&body))
            .await?;
        Ok(())
    }

    pub async fn delete_project(
        &self,
        organization_id: &str,
        project_id: &str,
    ) -> Result<(), RemoteError> {
        let body = DeleteProjectRequest {
            organization_id: organization_id.to_string(),
            project_id: project_id.to_string(),
        };
        self.send(Method::DELETE, "api/codebase-indexing/project", Some(&body))
            .await?;
        Ok(())
    }

    /// 404 maps to `Ok(None)` — "branch has no chunks" is not an error.
    pub async fn manifest(
        &self,
        organization_id: &str,
        project_id: &str,
        git_branch: &str,
    ) -> Result<Option<ServerManifest>, RemoteError> {
        let mut url = self.url("api/codebase-indexing/manifest")?;
        url.query_pairs_mut()
            .append_pair("organizationId", organization_id)
            .append_pair("projectId", project_id)
            .append_pair("gitBranch", git_branch);

        let res = self
            .http
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(RemoteError::Remote { status, body });
        }
        let manifest: ManifestResponse = res
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Some(manifest.into()))
    }
}
