//! REST registry client (Confluent-style API surface).
//!
//! Context scoping rides on qualified subject names (`:.ctx:subject`); the
//! default context uses bare names. The client owns a `reqwest::Client` with
//! a per-call timeout — timeouts apply per network call, never per run.

use serde::{Deserialize, Serialize};
use sreg_core::{
    CompatibilityMode, DEFAULT_CONTEXT, SchemaReference, SchemaType, SchemaVersion,
};

use crate::error::RegistryError;
use crate::http::check_response;
use crate::{RegistryApi, qualified_subject, split_qualified};

/// HTTP client for a schema registry's REST API.
#[derive(Debug, Clone)]
pub struct RestRegistryClient {
    base_url: String,
    http: reqwest::Client,
    basic_auth: Option<(String, String)>,
}

impl RestRegistryClient {
    /// Create a client for the registry at `base_url`.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` fails to build.
    #[must_use]
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .user_agent("sreg/0.1")
                .timeout(timeout)
                .build()
                .expect("reqwest client should build"),
            basic_auth: None,
        }
    }

    /// Attach basic-auth credentials to every request.
    #[must_use]
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = Some((username.to_string(), password.to_string()));
        self
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.get(url))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.post(url))
    }

    fn put(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.put(url))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.basic_auth {
            Some((username, password)) => builder.basic_auth(username, Some(password)),
            None => builder,
        }
    }

    fn subject_url(&self, path: &str, subject: &str, context: &str) -> String {
        let qualified = qualified_subject(subject, context);
        format!(
            "{}/{path}/{}",
            self.base_url,
            urlencoding::encode(&qualified)
        )
    }
}

// ── Wire shapes ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VersionResponse {
    id: u32,
    version: u32,
    #[serde(default, rename = "schemaType")]
    schema_type: Option<String>,
    schema: String,
    #[serde(default)]
    references: Vec<ReferenceWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReferenceWire {
    name: String,
    subject: String,
    version: u32,
}

impl From<ReferenceWire> for SchemaReference {
    fn from(wire: ReferenceWire) -> Self {
        Self {
            name: wire.name,
            subject: wire.subject,
            version: wire.version,
        }
    }
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    schema: &'a str,
    #[serde(rename = "schemaType")]
    schema_type: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<ReferenceWire>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    #[serde(rename = "compatibilityLevel")]
    compatibility_level: String,
}

#[derive(Debug, Serialize)]
struct ConfigRequest<'a> {
    compatibility: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompatibilityResponse {
    is_compatible: bool,
}

fn parse_schema_type(wire: Option<&str>) -> Result<SchemaType, RegistryError> {
    wire.unwrap_or("AVRO")
        .parse()
        .map_err(RegistryError::Parse)
}

// ── RegistryApi ────────────────────────────────────────────────────

#[async_trait::async_trait]
impl RegistryApi for RestRegistryClient {
    async fn list_contexts(&self) -> Result<Vec<String>, RegistryError> {
        let url = format!("{}/contexts", self.base_url);
        match check_response(self.get(&url).send().await?).await {
            Ok(resp) => Ok(resp.json().await?),
            // Older registries have no contexts endpoint; only the implicit
            // default context exists.
            Err(RegistryError::NotFound(_)) => Ok(vec![DEFAULT_CONTEXT.to_string()]),
            Err(e) => Err(e),
        }
    }

    async fn list_subjects(&self, context: &str) -> Result<Vec<String>, RegistryError> {
        let url = if context == DEFAULT_CONTEXT {
            format!("{}/subjects", self.base_url)
        } else {
            format!(
                "{}/subjects?subjectPrefix={}",
                self.base_url,
                urlencoding::encode(&format!(":.{context}:"))
            )
        };
        let resp = check_response(self.get(&url).send().await?).await?;
        let names: Vec<String> = resp.json().await?;
        // The registry answers with qualified names for non-default contexts
        // and may mix them into the default listing; keep only this
        // context's subjects, unqualified.
        Ok(names
            .into_iter()
            .filter_map(|name| {
                let (ctx, subject) = split_qualified(&name);
                (ctx == context).then_some(subject)
            })
            .collect())
    }

    async fn list_versions(
        &self,
        subject: &str,
        context: &str,
    ) -> Result<Vec<u32>, RegistryError> {
        let url = format!("{}/versions", self.subject_url("subjects", subject, context));
        let resp = check_response(self.get(&url).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn get_schema(
        &self,
        subject: &str,
        version: u32,
        context: &str,
    ) -> Result<SchemaVersion, RegistryError> {
        let url = format!(
            "{}/versions/{version}",
            self.subject_url("subjects", subject, context)
        );
        let resp = check_response(self.get(&url).send().await?).await?;
        let wire: VersionResponse = resp.json().await?;
        Ok(SchemaVersion {
            subject: subject.to_string(),
            context: context.to_string(),
            version: wire.version,
            id: Some(wire.id),
            schema: wire.schema,
            schema_type: parse_schema_type(wire.schema_type.as_deref())?,
            references: wire.references.into_iter().map(Into::into).collect(),
        })
    }

    async fn register_schema(
        &self,
        subject: &str,
        context: &str,
        schema: &str,
        schema_type: SchemaType,
        references: &[SchemaReference],
    ) -> Result<u32, RegistryError> {
        let url = format!("{}/versions", self.subject_url("subjects", subject, context));
        let body = RegisterRequest {
            schema,
            schema_type: schema_type.as_str(),
            references: references
                .iter()
                .map(|r| ReferenceWire {
                    name: r.name.clone(),
                    subject: r.subject.clone(),
                    version: r.version,
                })
                .collect(),
        };
        let resp = check_response(self.post(&url).json(&body).send().await?).await?;
        let registered: RegisterResponse = resp.json().await?;
        tracing::debug!(subject, context, id = registered.id, "registered schema");
        Ok(registered.id)
    }

    async fn get_compatibility(
        &self,
        subject: &str,
        context: &str,
    ) -> Result<Option<CompatibilityMode>, RegistryError> {
        let url = self.subject_url("config", subject, context);
        match check_response(self.get(&url).send().await?).await {
            Ok(resp) => {
                let config: ConfigResponse = resp.json().await?;
                config
                    .compatibility_level
                    .parse()
                    .map(Some)
                    .map_err(RegistryError::Parse)
            }
            // No subject-level override; the subject inherits the default.
            Err(RegistryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_compatibility(
        &self,
        subject: &str,
        mode: CompatibilityMode,
        context: &str,
    ) -> Result<(), RegistryError> {
        let url = self.subject_url("config", subject, context);
        let body = ConfigRequest {
            compatibility: mode.as_str(),
        };
        check_response(self.put(&url).json(&body).send().await?).await?;
        Ok(())
    }

    async fn check_compatibility(
        &self,
        subject: &str,
        candidate: &str,
        schema_type: SchemaType,
        context: &str,
    ) -> Result<bool, RegistryError> {
        let url = format!(
            "{}/versions/latest",
            self.subject_url("compatibility/subjects", subject, context)
        );
        let body = RegisterRequest {
            schema: candidate,
            schema_type: schema_type.as_str(),
            references: Vec::new(),
        };
        match check_response(self.post(&url).json(&body).send().await?).await {
            Ok(resp) => {
                let result: CompatibilityResponse = resp.json().await?;
                Ok(result.is_compatible)
            }
            // A subject with no versions accepts anything.
            Err(RegistryError::NotFound(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }
}
