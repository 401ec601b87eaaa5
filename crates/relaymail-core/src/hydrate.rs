//! Attachment hydration: downloads attachment content and infers metadata.

use crate::error::{FetchError, Result, TransportError, ValidationError};
use crate::model::Attachment;
use percent_encoding::percent_decode_str;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use std::time::Duration;
use tracing::{debug, warn};

/// Downloads attachment bodies from their source URLs.
///
/// Attachments are fetched one after another in list order; the first
/// failure aborts the pass.
#[derive(Debug, Clone, Default)]
pub struct Hydrator {
    client: reqwest::Client,
}

impl Hydrator {
    /// Creates a hydrator around an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Creates a hydrator whose requests give up after `timeout`, if set.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::Http)?;
        Ok(Self { client })
    }

    /// Fills `body`, `content_type` and `filename` of every attachment that
    /// has no content yet. Fields the caller already set are kept.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingAttachmentSource`] for an attachment
    /// without content or URL, and [`FetchError`] when a download fails.
    pub async fn hydrate(&self, attachments: &mut [Attachment]) -> Result<()> {
        for (index, attachment) in attachments.iter_mut().enumerate() {
            if !attachment.body.is_empty() {
                continue;
            }
            if attachment.source_url.trim().is_empty() {
                return Err(ValidationError::MissingAttachmentSource { index }.into());
            }

            self.fetch(index, attachment).await.inspect_err(|err| {
                warn!(index, url = %attachment.source_url, error = %err, "attachment fetch failed");
            })?;
        }
        Ok(())
    }

    async fn fetch(&self, index: usize, attachment: &mut Attachment) -> Result<()> {
        let url = attachment.source_url.clone();
        debug!(index, url = %url, "fetching attachment");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            }
            .into());
        }

        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Body {
                url: url.clone(),
                source,
            })?;
        attachment.body = body.to_vec();

        if attachment.content_type.is_empty()
            && let Some(content_type) = content_type_from(&headers)
        {
            attachment.content_type = content_type;
        }

        if attachment.filename.is_empty() {
            attachment.filename = headers
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok())
                .and_then(filename_from_disposition)
                .or_else(|| filename_from_url(&url))
                .unwrap_or_else(|| format!("attachment_{}", index + 1));
        }

        debug!(
            index,
            bytes = attachment.body.len(),
            content_type = %attachment.content_type,
            filename = %attachment.filename,
            "attachment fetched"
        );
        Ok(())
    }
}

/// Media type from `Content-Type`, without parameters such as charset.
fn content_type_from(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let media_type = value.split(';').next().unwrap_or_default().trim();
    (!media_type.is_empty()).then(|| media_type.to_string())
}

/// Extracts the `filename=` parameter of a `Content-Disposition` value.
fn filename_from_disposition(value: &str) -> Option<String> {
    let lower = value.to_ascii_lowercase();
    let start = lower.find("filename=")? + "filename=".len();
    let raw = value[start..].split(';').next().unwrap_or_default();
    let name = raw.trim().trim_matches('"').trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Last path segment of `url` as written, without query or fragment and
/// percent-decoded.
fn filename_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/')?.1,
        None => without_query,
    };
    let tail = path.rsplit('/').next().unwrap_or_default();
    let name = percent_decode_str(tail).decode_utf8_lossy();
    (!matches!(name.trim(), "" | "." | "..")).then(|| name.into_owned())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::Error;
    use reqwest::header::HeaderValue;

    #[test]
    fn disposition_filename_quoted() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"report.pdf\""),
            Some("report.pdf".to_string())
        );
    }

    #[test]
    fn disposition_filename_stops_at_next_parameter() {
        assert_eq!(
            filename_from_disposition("attachment; FileName=data.csv; size=120"),
            Some("data.csv".to_string())
        );
    }

    #[test]
    fn disposition_without_filename() {
        assert_eq!(filename_from_disposition("inline"), None);
        assert_eq!(filename_from_disposition("attachment; filename=\"\""), None);
    }

    #[test]
    fn url_tail_strips_query_and_fragment() {
        assert_eq!(
            filename_from_url("https://cdn.test/files/invoice.pdf?sig=abc#page=2"),
            Some("invoice.pdf".to_string())
        );
        assert_eq!(filename_from_url("https://cdn.test/files/"), None);
        assert_eq!(filename_from_url("https://cdn.test"), None);
        assert_eq!(filename_from_url("not a url/x.txt?y"), Some("x.txt".to_string()));
    }

    #[test]
    fn url_tail_is_taken_as_written() {
        assert_eq!(
            filename_from_url("https://cdn.test/reports/q3%20report.pdf"),
            Some("q3 report.pdf".to_string())
        );
        assert_eq!(
            filename_from_url("https://cdn.test/reports/q3 report.pdf"),
            Some("q3 report.pdf".to_string())
        );
        assert_eq!(
            filename_from_url("https://cdn.test/a/../b/r%C3%A9sum%C3%A9.pdf"),
            Some("résumé.pdf".to_string())
        );
        assert_eq!(filename_from_url("https://cdn.test/files/.."), None);
    }

    #[test]
    fn content_type_drops_parameters() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
        assert_eq!(content_type_from(&headers), Some("text/csv".to_string()));
        assert_eq!(content_type_from(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn attachments_with_content_are_untouched() {
        let mut attachments = vec![Attachment::inline("a.txt", "", b"hi".to_vec())];
        Hydrator::default().hydrate(&mut attachments).await.unwrap();
        assert_eq!(attachments[0].content_type, "");
        assert_eq!(attachments[0].filename, "a.txt");
    }

    #[tokio::test]
    async fn missing_source_is_validation_error() {
        let mut attachments = vec![
            Attachment::inline("a.txt", "text/plain", b"hi".to_vec()),
            Attachment::default(),
        ];
        let err = Hydrator::default().hydrate(&mut attachments).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingAttachmentSource { index: 1 })
        ));
    }
}
