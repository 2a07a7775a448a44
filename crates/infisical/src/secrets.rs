//! Raw secret retrieval for one project/environment/path.

use crate::error::{read_error_body, report_remote_error, report_request_error};
use crate::{FetchError, InfisicalClient};
use keyrelay_secrets::{Credential, ResolvedSecrets, SecretEntry};
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Endpoint returning decrypted secrets.
pub const RAW_SECRETS_PATH: &str = "/api/v3/secrets/raw";

/// Which secrets to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPath {
    /// Environment slug (e.g. `dev`, `prod`)
    pub environment: String,
    /// Project (workspace) slug
    pub project: String,
    /// Folder path inside the project, e.g. `/` or `/backend`
    pub path: String,
    /// Also return secrets imported into this path
    pub include_imports: bool,
    /// Also return secrets from sub-folders
    pub recursive: bool,
}

impl SecretPath {
    /// Root folder, imports included, not recursive.
    #[must_use]
    pub fn new(project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            project: project.into(),
            path: "/".to_string(),
            include_imports: true,
            recursive: false,
        }
    }

    /// Set the folder path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Toggle import inclusion.
    #[must_use]
    pub const fn with_imports(mut self, include_imports: bool) -> Self {
        self.include_imports = include_imports;
        self
    }

    /// Toggle sub-folder recursion.
    #[must_use]
    pub const fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn query(&self) -> [(&'static str, &str); 6] {
        [
            ("secretPath", self.path.as_str()),
            ("environment", self.environment.as_str()),
            ("include_imports", bool_param(self.include_imports)),
            ("recursive", bool_param(self.recursive)),
            ("workspaceSlug", self.project.as_str()),
            ("expandSecretReferences", "true"),
        ]
    }
}

const fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// One import source in a raw secrets response.
#[derive(Debug, Deserialize)]
pub struct SecretImport {
    /// Secrets contributed by the import
    #[serde(default)]
    pub secrets: Vec<SecretEntry>,
}

impl AsRef<[SecretEntry]> for SecretImport {
    fn as_ref(&self) -> &[SecretEntry] {
        &self.secrets
    }
}

#[derive(Debug, Deserialize)]
struct RawSecretsResponse {
    secrets: Vec<SecretEntry>,
    #[serde(default)]
    imports: Option<Vec<SecretImport>>,
}

/// Fetches and merges secrets for a [`SecretPath`].
#[derive(Debug, Clone)]
pub struct SecretResolver {
    client: InfisicalClient,
}

impl SecretResolver {
    /// Create a resolver over `client`.
    #[must_use]
    pub const fn new(client: InfisicalClient) -> Self {
        Self { client }
    }

    /// Fetch the secrets at `target` and fold imports into a single map.
    ///
    /// Makes exactly one request. Keys defined directly at the path win over
    /// imported ones; among imports, a later import wins over an earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the server cannot be reached,
    /// [`FetchError::Rejected`] on a non-2xx status (including an expired or
    /// revoked credential) and [`FetchError::Decode`] for a malformed body.
    #[instrument(skip_all, fields(project = %target.project, environment = %target.environment, path = %target.path))]
    pub async fn resolve(
        &self,
        target: &SecretPath,
        credential: &Credential,
    ) -> Result<ResolvedSecrets, FetchError> {
        let url = self.client.url(RAW_SECRETS_PATH);
        debug!(
            include_imports = target.include_imports,
            recursive = target.recursive,
            "Fetching secrets"
        );

        let response = self
            .client
            .http()
            .get(&url)
            .query(&target.query())
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                message: report_request_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(FetchError::Rejected {
                status: status.as_u16(),
                message: report_remote_error(status, &body),
            });
        }

        let raw: RawSecretsResponse = response.json().await.map_err(|e| FetchError::Decode {
            message: report_request_error(&e),
        })?;

        let imports = raw.imports.unwrap_or_default();
        let resolved = ResolvedSecrets::merge(&raw.secrets, &imports);
        info!(count = resolved.len(), "Fetched secrets");
        Ok(resolved)
    }
}
