//! Remote expansion contract and its HTTP implementation.

use serde::{Deserialize, Serialize};
use termgraph_store::{CharacteristicType, ConceptId};
use url::Url;

use crate::EclError;

/// A concept named by a remote result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRef {
    pub id: ConceptId,
    pub fsn: Option<String>,
}

/// One page of a remote expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EclPage {
    pub items: Vec<ConceptRef>,
    /// Size of the full result, not of this page.
    pub total: usize,
    /// Required whenever fewer than `total` items have been handed out.
    pub next_cursor: Option<String>,
}

/// Cursor-paged expansion of expressions the local store cannot answer.
pub trait RemoteEclClient: Send + Sync {
    fn query(
        &self,
        expression: &str,
        branch: &str,
        characteristic_type: CharacteristicType,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<EclPage, EclError>;
}

/// Used when no terminology server is configured; every query fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl RemoteEclClient for NoRemote {
    fn query(
        &self,
        expression: &str,
        _branch: &str,
        _characteristic_type: CharacteristicType,
        _cursor: Option<&str>,
        _page_size: usize,
    ) -> Result<EclPage, EclError> {
        Err(EclError::remote(expression, "no remote terminology server configured"))
    }
}

// ============================================================================
// Terminology server wire format
// ============================================================================

/// `GET {base}/{branch}/concepts?ecl=..&limit=..&searchAfter=..`, with
/// `statedEcl` in place of `ecl` for the stated view.
pub fn concepts_url(
    base: &Url,
    expression: &str,
    branch: &str,
    characteristic_type: CharacteristicType,
    cursor: Option<&str>,
    page_size: usize,
) -> Result<Url, EclError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| EclError::remote(expression, format!("base URL `{base}` cannot carry a path")))?
        .pop_if_empty()
        .extend(branch.split('/').filter(|s| !s.is_empty()))
        .push("concepts");
    {
        let mut query = url.query_pairs_mut();
        let key = match characteristic_type {
            CharacteristicType::Stated => "statedEcl",
            _ => "ecl",
        };
        query.append_pair(key, expression);
        query.append_pair("limit", &page_size.to_string());
        if let Some(cursor) = cursor {
            query.append_pair("searchAfter", cursor);
        }
    }
    Ok(url)
}

#[derive(Deserialize)]
struct WirePage {
    #[serde(default)]
    items: Vec<WireConcept>,
    #[serde(default)]
    total: usize,
    #[serde(rename = "searchAfter")]
    search_after: Option<String>,
}

#[derive(Deserialize)]
struct WireConcept {
    #[serde(rename = "conceptId")]
    concept_id: String,
    fsn: Option<WireTerm>,
}

#[derive(Deserialize)]
struct WireTerm {
    term: String,
}

/// Decode a concepts page body.
pub fn decode_page(expression: &str, body: &str) -> Result<EclPage, EclError> {
    let wire: WirePage = serde_json::from_str(body)
        .map_err(|e| EclError::protocol(expression, format!("invalid concepts page: {e}")))?;
    let items = wire
        .items
        .into_iter()
        .map(|c| {
            let id = c
                .concept_id
                .parse()
                .map_err(|_| EclError::protocol(expression, format!("invalid conceptId `{}`", c.concept_id)))?;
            Ok(ConceptRef {
                id,
                fsn: c.fsn.map(|t| t.term).filter(|t| !t.is_empty()),
            })
        })
        .collect::<Result<Vec<_>, EclError>>()?;
    Ok(EclPage {
        items,
        total: wire.total,
        next_cursor: wire.search_after,
    })
}

#[cfg(feature = "remote-http")]
pub use http::HttpEclClient;

#[cfg(feature = "remote-http")]
mod http {
    use super::*;
    use std::time::Duration;
    use tracing::debug;

    /// Blocking client for a terminology server's concepts endpoint.
    pub struct HttpEclClient {
        base: Url,
        client: reqwest::blocking::Client,
    }

    impl HttpEclClient {
        pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EclError> {
            let base = Url::parse(base_url)
                .map_err(|e| EclError::remote(base_url, format!("invalid base URL: {e}")))?;
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| EclError::remote(base_url, format!("failed to build http client: {e}")))?;
            Ok(Self { base, client })
        }

        pub fn base_url(&self) -> &Url {
            &self.base
        }
    }

    impl RemoteEclClient for HttpEclClient {
        fn query(
            &self,
            expression: &str,
            branch: &str,
            characteristic_type: CharacteristicType,
            cursor: Option<&str>,
            page_size: usize,
        ) -> Result<EclPage, EclError> {
            let url = concepts_url(&self.base, expression, branch, characteristic_type, cursor, page_size)?;
            debug!(%url, "requesting ECL page");
            let resp = self
                .client
                .get(url.clone())
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .map_err(|e| EclError::remote(expression, format!("failed to reach {url}: {e}")))?;
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            if !status.is_success() {
                return Err(EclError::remote(expression, format!("http error {status}: {text}")));
            }
            decode_page(expression, &text)
        }
    }
}
