//! # Switcher Status Client
//!
//! Reads program/preview state and input labels from the production
//! switcher's HTTP/XML status API.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Digest-Authenticated GET                              │
//! │                                                                         │
//! │   GET /v1/dictionary?key=tally ─────────────────► switcher              │
//! │   ◄───────────── 401 + WWW-Authenticate: Digest realm=..., nonce=...    │
//! │                                                                         │
//! │   GET /v1/dictionary?key=tally                                          │
//! │       Authorization: Digest username=..., response=... ───► switcher    │
//! │   ◄───────────────────────────────────────────── 200 application/xml    │
//! │                                                                         │
//! │   key=switcher → <physical_input physical_input_number= iso_label=/>   │
//! │   key=tally    → <column name= on_pgm="true|false" on_prev=.../>       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Neither fetch ever returns an error to the scheduler. Label failures give an
//! empty label map; tally failures give an empty snapshot plus the error in a
//! [`FetchOutcome`].

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use tally_core::{SourceId, SourceLabels, SourceSnapshot};
use tracing::{debug, warn};
use url::Url;

use crate::config::SwitcherSettings;
use crate::error::{BridgeError, BridgeResult};

/// Dictionary key for the input label document.
pub const LABELS_KEY: &str = "switcher";

/// Dictionary key for the tally document.
pub const TALLY_KEY: &str = "tally";

// =============================================================================
// Source Trait
// =============================================================================

/// Result of a tally fetch.
///
/// Always carries a snapshot; on failure it is empty and `error` says why.
#[derive(Debug)]
pub struct FetchOutcome {
    pub snapshot: SourceSnapshot,
    pub error: Option<BridgeError>,
}

impl FetchOutcome {
    pub fn fetched(snapshot: SourceSnapshot) -> Self {
        FetchOutcome {
            snapshot,
            error: None,
        }
    }

    pub fn failed(error: BridgeError) -> Self {
        FetchOutcome {
            snapshot: SourceSnapshot::empty(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Anything that can report program/preview state.
#[async_trait]
pub trait SwitcherSource: Send + Sync {
    /// Display labels for inputs. Empty on any failure.
    async fn fetch_labels(&self) -> SourceLabels;

    /// Current program/preview snapshot.
    async fn fetch_tally(&self, labels: &SourceLabels) -> FetchOutcome;
}

// =============================================================================
// HTTP Client
// =============================================================================

/// Digest-authenticated client for the switcher's dictionary endpoint.
#[derive(Debug, Clone)]
pub struct SourceStatusClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
    timeout: Duration,
}

impl SourceStatusClient {
    /// Builds a client from switcher settings.
    pub fn new(settings: &SwitcherSettings) -> BridgeResult<Self> {
        let base_url = Url::parse(settings.base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(BridgeError::InvalidUrl(settings.base_url.clone()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|e| BridgeError::InvalidConfig(format!("user_agent: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()
            .map_err(|e| BridgeError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(SourceStatusClient {
            http,
            base_url,
            username: settings.username.clone(),
            password: settings.password.clone(),
            timeout: settings.timeout(),
        })
    }

    /// `{base}/v1/dictionary?key={key}`.
    pub fn dictionary_url(&self, key: &str) -> BridgeResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BridgeError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v1", "dictionary"]);
        url.query_pairs_mut().clear().append_pair("key", key);
        Ok(url)
    }

    fn request_error(&self, err: reqwest::Error) -> BridgeError {
        if err.is_timeout() {
            BridgeError::timeout("switcher request", self.timeout)
        } else {
            err.into()
        }
    }

    /// GET with one digest challenge round-trip.
    async fn get_document(&self, key: &str) -> BridgeResult<String> {
        let url = self.dictionary_url(key)?;

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    BridgeError::DigestChallenge("401 without WWW-Authenticate header".into())
                })?;

            let uri = &url[url::Position::BeforePath..];
            let context =
                digest_auth::AuthContext::new(self.username.as_str(), self.password.as_str(), uri);
            let answer = answer_challenge(challenge, &context)?;

            debug!(key, "Answering digest challenge");
            self.http
                .get(url.clone())
                .header(AUTHORIZATION, answer)
                .send()
                .await
                .map_err(|e| self.request_error(e))?
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| self.request_error(e))
    }
}

/// `Authorization` header value answering a `WWW-Authenticate: Digest` challenge.
fn answer_challenge(challenge: &str, context: &digest_auth::AuthContext<'_>) -> BridgeResult<String> {
    let mut prompt = digest_auth::parse(challenge)?;
    Ok(prompt.respond(context)?.to_header_string())
}

#[async_trait]
impl SwitcherSource for SourceStatusClient {
    async fn fetch_labels(&self) -> SourceLabels {
        let labels = match self.get_document(LABELS_KEY).await {
            Ok(body) => parse_labels(&body),
            Err(e) => Err(e),
        };

        labels.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch input labels");
            SourceLabels::new()
        })
    }

    async fn fetch_tally(&self, labels: &SourceLabels) -> FetchOutcome {
        let snapshot = match self.get_document(TALLY_KEY).await {
            Ok(body) => parse_tally(&body),
            Err(e) => Err(e),
        };

        match snapshot {
            Ok(snapshot) => {
                debug!(
                    program = ?snapshot
                        .program_sources
                        .iter()
                        .map(|s| labels.label_for(s))
                        .collect::<Vec<_>>(),
                    preview = ?snapshot.preview_source.as_ref().map(|s| labels.label_for(s)),
                    "Fetched tally state"
                );
                FetchOutcome::fetched(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch tally state");
                FetchOutcome::failed(e)
            }
        }
    }
}

// =============================================================================
// Document Parsing
// =============================================================================

fn xml_error(err: impl std::fmt::Display) -> BridgeError {
    BridgeError::MalformedResponse(err.to_string())
}

fn attribute(element: &BytesStart<'_>, name: &str) -> BridgeResult<Option<String>> {
    match element.try_get_attribute(name).map_err(xml_error)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned())),
        None => Ok(None),
    }
}

/// Walks every element of `xml`, calling `visit` for each start or empty tag.
///
/// Fails on XML errors, on documents without any element and on unclosed
/// elements at end of input.
fn walk_elements<F>(xml: &str, mut visit: F) -> BridgeResult<()>
where
    F: FnMut(&BytesStart<'_>) -> BridgeResult<()>,
{
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut seen_element = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                depth += 1;
                seen_element = true;
                visit(&e)?;
            }
            Event::Empty(e) => {
                seen_element = true;
                visit(&e)?;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_element {
        return Err(xml_error("document contains no elements"));
    }
    if depth != 0 {
        return Err(xml_error("document ended inside an element"));
    }
    Ok(())
}

/// Parses the `key=switcher` document into input labels.
///
/// Inputs without a `physical_input_number` are skipped; inputs without an
/// `iso_label` are labelled with their id.
pub fn parse_labels(xml: &str) -> BridgeResult<SourceLabels> {
    let mut labels = SourceLabels::new();

    walk_elements(xml, |element| {
        if element.local_name().as_ref() != b"physical_input" {
            return Ok(());
        }

        if let Some(number) = attribute(element, "physical_input_number")? {
            let source = SourceId::from_switcher(&number);
            let label = attribute(element, "iso_label")?
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| source.to_string());
            labels.insert(source, label);
        }
        Ok(())
    })?;

    Ok(labels)
}

/// Parses the `key=tally` document into a snapshot.
///
/// Columns are read in document order. Every `on_pgm="true"` column is added
/// to program; each `on_prev="true"` column replaces the preview source, so the
/// last one wins.
pub fn parse_tally(xml: &str) -> BridgeResult<SourceSnapshot> {
    let mut program = Vec::new();
    let mut preview: Option<SourceId> = None;
    let mut preview_claims = 0usize;

    walk_elements(xml, |element| {
        if element.local_name().as_ref() != b"column" {
            return Ok(());
        }

        let Some(name) = attribute(element, "name")? else {
            return Ok(());
        };
        let source = SourceId::from_switcher(&name);

        if attribute(element, "on_pgm")?.as_deref() == Some("true") {
            program.push(source.clone());
        }
        if attribute(element, "on_prev")?.as_deref() == Some("true") {
            preview_claims += 1;
            preview = Some(source);
        }
        Ok(())
    })?;

    if preview_claims > 1 {
        warn!(
            claims = preview_claims,
            preview = ?preview.as_ref().map(SourceId::as_str),
            "Several columns claim preview, keeping the last"
        );
    }

    Ok(SourceSnapshot::new(program, preview))
}
