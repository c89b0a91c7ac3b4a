use std::future::Future;

use serde::Deserialize;
use suito_core::{FragmentKind, RecognizedDocument, TextFragment, TraceContext, Vertex};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("Recognition request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Recognition service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Recognition service error: {0}")]
    Service(String),
}

/// Abstraction over the external document recognition service.
/// Implementations accept encoded image bytes plus their MIME type and return
/// typed text fragments with page-normalized polygons.
pub trait DocumentRecognizer: Send + Sync {
    fn recognize(
        &self,
        ctx: &TraceContext,
        image_bytes: &[u8],
        mime_type: &str,
    ) -> impl Future<Output = Result<RecognizedDocument, RecognizeError>> + Send;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a preset document (or a preset failure) regardless of the image.
pub struct MockRecognizer {
    result: Result<RecognizedDocument, String>,
}

impl MockRecognizer {
    pub fn new(document: RecognizedDocument) -> Self {
        Self { result: Ok(document) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { result: Err(message.into()) }
    }
}

impl DocumentRecognizer for MockRecognizer {
    async fn recognize(
        &self,
        _ctx: &TraceContext,
        _image_bytes: &[u8],
        _mime_type: &str,
    ) -> Result<RecognizedDocument, RecognizeError> {
        self.result.clone().map_err(RecognizeError::Service)
    }
}

// ── HTTP backend ──────────────────────────────────────────────────────────────

/// Posts the raw image to a recognition endpoint and reads back JSON of the
/// form `{"fragments": [{"text", "kind", "polygon": [{"x", "y"}, …]}]}`.
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRecognizer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into(), api_key }
    }
}

impl DocumentRecognizer for HttpRecognizer {
    async fn recognize(
        &self,
        ctx: &TraceContext,
        image_bytes: &[u8],
        mime_type: &str,
    ) -> Result<RecognizedDocument, RecognizeError> {
        info!(trace_id = %ctx, endpoint = %self.endpoint, mime_type, "sending image to recognition service");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .header("X-Trace-Id", ctx.trace_id.as_str())
            .body(image_bytes.to_vec());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognizeError::Status { status: status.as_u16(), body });
        }

        let wire: WireDocument = response.json().await?;
        let document = wire.into_document(ctx);
        info!(trace_id = %ctx, fragments = document.fragments.len(), "recognition finished");
        Ok(document)
    }
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    #[serde(default)]
    fragments: Vec<WireFragment>,
}

#[derive(Debug, Deserialize)]
struct WireFragment {
    #[serde(default)]
    text: String,
    kind: String,
    #[serde(default)]
    polygon: Option<Vec<Vertex>>,
}

impl WireDocument {
    /// Keeps fragments whose kind is one we understand.
    fn into_document(self, ctx: &TraceContext) -> RecognizedDocument {
        let fragments = self
            .fragments
            .into_iter()
            .filter_map(|f| match f.kind.parse::<FragmentKind>() {
                Ok(kind) => Some(TextFragment { text: f.text, kind, polygon: f.polygon }),
                Err(e) => {
                    debug!(trace_id = %ctx, error = %e, "fragment of unknown kind ignored");
                    None
                }
            })
            .collect();
        RecognizedDocument { fragments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TraceContext {
        TraceContext::new("test")
    }

    #[tokio::test]
    async fn mock_returns_preset_document() {
        let doc = RecognizedDocument::new(vec![TextFragment::with_rect(
            "現金支払",
            FragmentKind::Title,
            (0.3, 0.05, 0.7, 0.08),
        )]);
        let r = MockRecognizer::new(doc.clone());
        assert_eq!(r.recognize(&ctx(), b"fake image data", "image/jpeg").await.unwrap(), doc);
        assert_eq!(r.recognize(&ctx(), b"", "image/png").await.unwrap(), doc);
    }

    #[tokio::test]
    async fn failing_mock_returns_service_error() {
        let r = MockRecognizer::failing("quota exceeded");
        let err = r.recognize(&ctx(), b"x", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, RecognizeError::Service(ref m) if m == "quota exceeded"));
    }

    #[test]
    fn wire_document_drops_unknown_kinds() {
        let json = r#"{
            "fragments": [
                {"text": "商品A", "kind": "item",
                 "polygon": [{"x": 0.1, "y": 0.2}, {"x": 0.4, "y": 0.2},
                             {"x": 0.4, "y": 0.22}, {"x": 0.1, "y": 0.22}]},
                {"text": "合計", "kind": "total"},
                {"text": "現金支払", "kind": "title"}
            ]
        }"#;
        let wire: WireDocument = serde_json::from_str(json).unwrap();
        let doc = wire.into_document(&ctx());
        assert_eq!(doc.fragments.len(), 2);
        assert_eq!(doc.fragments[0].kind, FragmentKind::Item);
        assert_eq!(doc.fragments[0].polygon.as_ref().unwrap().len(), 4);
        assert_eq!(doc.fragments[1].kind, FragmentKind::Title);
        assert!(doc.fragments[1].polygon.is_none());
    }

    #[test]
    fn wire_vertices_may_omit_zero_coordinates() {
        let json = r#"{"fragments": [{"text": "x", "kind": "amount",
            "polygon": [{}, {"x": 0.3}, {"x": 0.3, "y": 0.1}, {"y": 0.1}]}]}"#;
        let wire: WireDocument = serde_json::from_str(json).unwrap();
        let doc = wire.into_document(&ctx());
        let polygon = doc.fragments[0].polygon.as_ref().unwrap();
        assert_eq!(polygon[0], Vertex::default());
        assert_eq!(polygon[1].x, Some(0.3));
    }
}
