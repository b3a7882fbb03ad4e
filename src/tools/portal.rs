//! HTTP-backed genomics tools served by the portal tool backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::format::{format_response, ResultFormat, NO_RESULTS};
use super::tool::Tool;
use crate::error::PortalError;
use crate::util::http::shared_client;

const TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// `(tool name, backend path, result format)` for every portal tool.
const PORTAL_TOOLS: &[(&str, &str, ResultFormat)] = &[
    ("get_top_genes", "get_top_genes", ResultFormat::Json),
    ("search_phenotypes", "search_phenotypes", ResultFormat::PhenotypeMatches),
    ("get_genesets", "get_genesets", ResultFormat::Json),
    ("get_factors", "get_factors", ResultFormat::Json),
    ("run_cypher", "get_cipher", ResultFormat::Json),
];

/// One backend endpoint: `POST {base_url}/{path}` with the arguments as body.
#[derive(Debug, Clone)]
pub struct PortalTool {
    name: String,
    url: String,
    format: ResultFormat,
}

impl PortalTool {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        path: &str,
        format: ResultFormat,
    ) -> Self {
        Self {
            name: name.into(),
            url: format!("{}/{}", base_url.trim_end_matches('/'), path),
            format,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Tool for PortalTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, PortalError> {
        debug!(tool = %self.name, url = %self.url, "calling portal tool");

        let resp = shared_client()
            .post(&self.url)
            .timeout(TOOL_TIMEOUT)
            .json(&args)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(tool = %self.name, status = status.as_u16(), "portal tool returned an error status");
            return Ok(NO_RESULTS.to_string());
        }

        let bytes = resp.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(format_response(self.format, &body))
    }
}

/// All portal tools against one backend base URL.
pub fn portal_tools(base_url: &str) -> Vec<Arc<dyn Tool>> {
    PORTAL_TOOLS
        .iter()
        .map(|(name, path, format)| {
            Arc::new(PortalTool::new(*name, base_url, path, *format)) as Arc<dyn Tool>
        })
        .collect()
}
