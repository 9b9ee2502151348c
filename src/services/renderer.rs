//! Boundary turning question text into a displayable image URL.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by an image renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The rendering service could not be reached or answered garbage.
    #[error("rendering service request failed")]
    Request(#[from] reqwest::Error),
    /// The rendering service answered without an asset reference.
    #[error("rendering service returned no asset")]
    MissingAsset,
    /// The render request could not be encoded.
    #[error("failed to encode render request")]
    Encode(#[from] serde_json::Error),
}

/// Renders question text to an image reachable by URL.
pub trait ImageRenderer: Send + Sync {
    /// Render `text`, returning the asset URL.
    fn render(&self, text: String) -> BoxFuture<'static, Result<String, RenderError>>;
}

/// Renderer backed by a LaTeX-to-PNG HTTP service.
///
/// The service receives a complete LaTeX document and answers
/// `{"res": "<hash>"}`; the asset lives at `asset_url_prefix + hash`.
#[derive(Clone)]
pub struct LatexRenderer {
    client: Client,
    endpoint: Arc<str>,
    asset_url_prefix: Arc<str>,
}

#[derive(Debug, Serialize)]
struct RenderRequest {
    content: String,
    d: u32,
    border: &'static str,
    bcolor: &'static str,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    res: Option<String>,
}

impl LatexRenderer {
    /// Renderer posting to `endpoint` and resolving hashes under `asset_url_prefix`.
    pub fn new(endpoint: impl Into<Arc<str>>, asset_url_prefix: impl Into<Arc<str>>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            asset_url_prefix: asset_url_prefix.into(),
        }
    }

    async fn render_text(&self, text: &str) -> Result<String, RenderError> {
        let request = RenderRequest {
            content: latex_document(text),
            d: 800,
            border: "100x80",
            bcolor: "white",
        };

        // The service expects the JSON document as a text/plain body.
        let body = serde_json::to_string(&request)?;
        let response = self
            .client
            .post(&*self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .json::<RenderResponse>()
            .await?;

        match response.res {
            Some(hash) if !hash.is_empty() => Ok(format!("{}{}", self.asset_url_prefix, hash)),
            _ => Err(RenderError::MissingAsset),
        }
    }
}

impl ImageRenderer for LatexRenderer {
    fn render(&self, text: String) -> BoxFuture<'static, Result<String, RenderError>> {
        let this = self.clone();
        Box::pin(async move { this.render_text(&text).await })
    }
}

/// Wrap `text` in a standalone CJK-capable LaTeX document.
fn latex_document(text: &str) -> String {
    format!(
        "\\documentclass[32pt]{{article}}\n\\usepackage{{CJKutf8}}\n\\thispagestyle{{empty}}\n\\begin{{document}}\n\\begin{{CJK}}{{UTF8}}{{min}}\n{}\n\\end{{CJK}}\n\\end{{document}}\n",
        escape_latex(text)
    )
}

fn escape_latex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\textbackslash{}"),
            '{' | '}' | '$' | '&' | '#' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '^' => escaped.push_str("\\^{}"),
            '~' => escaped.push_str("\\~{}"),
            _ => escaped.push(c),
        }
    }
    escaped
}
