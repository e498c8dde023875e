//! Publish bookkeeping
//!
//! Artifact URLs are usually signed, so the same image can come back with
//! a different query string. Publish state is keyed on the canonical form
//! (scheme, host, port, path).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use design_service_types::{PublishBatchResponse, PublishPayload};

/// Canonical key of an artifact URL. Unparsable URLs are their own key.
pub fn canonical_key(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };
    let Some(host) = url.host_str() else {
        return raw.to_string();
    };

    let mut key = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        key.push_str(&format!(":{}", port));
    }
    key.push_str(url.path());
    key
}

/// Canonical keys of everything published in this session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishState {
    keys: HashSet<String>,
}

impl PublishState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_published(&self, url: &str) -> bool {
        self.keys.contains(&canonical_key(url))
    }

    /// Record a published URL. Returns false when it was already known.
    pub fn mark_published(&mut self, url: &str) -> bool {
        self.keys.insert(canonical_key(url))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Batch outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of one publish-many call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Dropped before the call because they were already published
    pub skipped_already_published: usize,
    /// Dropped before the call because an earlier input had the same
    /// canonical URL
    pub skipped_duplicates: usize,
    pub failures: Vec<BatchFailure>,
    pub newly_published: Vec<String>,
    /// Counts the service reported without saying which items they cover.
    /// Every item is then treated as unconfirmed.
    pub unattributed: Option<ReportedCounts>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedCounts {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn summary(&self) -> String {
        if let Some(counts) = self.unattributed {
            return format!(
                "Lark reported {} of {} designs added and {} failed, without saying which. \
                 None were marked as added.",
                counts.succeeded, self.submitted, counts.failed
            );
        }

        let mut text = format!(
            "Added {} of {} designs to Lark. {} failed",
            self.succeeded, self.submitted, self.failed
        );
        let reasons: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!("{} ({})", f.url, f.reason))
            .collect();
        if reasons.is_empty() {
            text.push('.');
        } else {
            text.push_str(": ");
            text.push_str(&reasons.join(", "));
        }
        text
    }
}

/// Per-item verdict for a batch, derived from the most specific data the
/// response carries:
///
/// 1. `results`, matched by index, then URL, then position
/// 2. `errors`, when every entry names its item by index or URL
/// 3. aggregate counts: everything succeeded only when `failed == 0` and
///    `succeeded` (if present) covers the whole batch; otherwise no item
///    is confirmed
///
/// Indices in the response are 0-based positions in the request.
pub fn resolve_batch_outcome(
    submitted: &[PublishPayload],
    response: &PublishBatchResponse,
) -> BatchReport {
    let verdicts: Vec<Result<(), String>> = if !response.results.is_empty() {
        from_results(submitted, response)
    } else if !response.errors.is_empty()
        && response
            .errors
            .iter()
            .all(|e| e.index().is_some() || e.image_url().is_some())
    {
        from_errors(submitted, response)
    } else {
        from_counts(submitted, response)
    };

    let mut report = BatchReport {
        submitted: submitted.len(),
        ..BatchReport::default()
    };
    if response.results.is_empty() && verdicts.iter().any(Result::is_err) {
        report.unattributed = unattributed_counts(submitted, response);
    }
    for (payload, verdict) in submitted.iter().zip(verdicts) {
        match verdict {
            Ok(()) => {
                report.succeeded += 1;
                report.newly_published.push(payload.image_url.clone());
            }
            Err(reason) => {
                report.failed += 1;
                report.failures.push(BatchFailure {
                    url: payload.image_url.clone(),
                    reason,
                });
            }
        }
    }
    report
}

fn same_artifact(a: &str, b: &str) -> bool {
    canonical_key(a) == canonical_key(b)
}

fn from_results(
    submitted: &[PublishPayload],
    response: &PublishBatchResponse,
) -> Vec<Result<(), String>> {
    submitted
        .iter()
        .enumerate()
        .map(|(i, payload)| {
            let result = response
                .results
                .iter()
                .find(|r| r.index == Some(i))
                .or_else(|| {
                    response.results.iter().find(|r| {
                        r.index.is_none()
                            && r.image_url
                                .as_deref()
                                .is_some_and(|u| same_artifact(u, &payload.image_url))
                    })
                })
                .or_else(|| {
                    response
                        .results
                        .get(i)
                        .filter(|r| r.index.is_none() && r.image_url.is_none())
                });

            match result {
                Some(r) if r.success => Ok(()),
                Some(r) => Err(r.error.clone().unwrap_or_else(|| "rejected".to_string())),
                None => Err("no result reported".to_string()),
            }
        })
        .collect()
}

fn from_errors(
    submitted: &[PublishPayload],
    response: &PublishBatchResponse,
) -> Vec<Result<(), String>> {
    submitted
        .iter()
        .enumerate()
        .map(|(i, payload)| {
            let error = response.errors.iter().find(|e| {
                e.index() == Some(i)
                    || e.image_url()
                        .is_some_and(|u| same_artifact(u, &payload.image_url))
            });
            match error {
                Some(e) => Err(e.message().unwrap_or("rejected").to_string()),
                None => Ok(()),
            }
        })
        .collect()
}

fn counts_cover_batch(submitted: &[PublishPayload], response: &PublishBatchResponse) -> bool {
    response.failed.unwrap_or(0) == 0
        && response.succeeded.map_or(true, |n| n >= submitted.len())
}

/// Aggregate counts when they are all the response offers and some item
/// may have failed.
fn unattributed_counts(
    submitted: &[PublishPayload],
    response: &PublishBatchResponse,
) -> Option<ReportedCounts> {
    let attributable = !response.errors.is_empty()
        && response
            .errors
            .iter()
            .all(|e| e.index().is_some() || e.image_url().is_some());
    if attributable || counts_cover_batch(submitted, response) {
        return None;
    }

    let succeeded = response.succeeded.unwrap_or(0);
    let failed = response
        .failed
        .unwrap_or_else(|| submitted.len().saturating_sub(succeeded));
    Some(ReportedCounts { succeeded, failed })
}

fn from_counts(
    submitted: &[PublishPayload],
    response: &PublishBatchResponse,
) -> Vec<Result<(), String>> {
    let all_succeeded = counts_cover_batch(submitted, response);

    submitted
        .iter()
        .map(|_| {
            if all_succeeded {
                Ok(())
            } else {
                Err("not confirmed by the service".to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use design_service_types::{BatchItemError, BatchItemResult};
    use pretty_assertions::assert_eq;

    fn payload(url: &str) -> PublishPayload {
        PublishPayload {
            image_url: url.to_string(),
            brand: "Nike".into(),
            category: "T-Shirt".into(),
            department: "Men".into(),
            sub_department: "Casual".into(),
            release_date: "2030-01-01".into(),
            dominant_color: None,
            base_design: None,
            variation: None,
        }
    }

    fn batch(n: usize) -> Vec<PublishPayload> {
        (0..n)
            .map(|i| payload(&format!("https://cdn.example.com/d/{}.png?sig=abc", i)))
            .collect()
    }

    #[test]
    fn test_canonical_key_drops_query_and_fragment() {
        assert_eq!(
            canonical_key("https://cdn.example.com/a/b.png?X-Signature=1#top"),
            "https://cdn.example.com/a/b.png"
        );
        assert_eq!(
            canonical_key("https://cdn.example.com:8443/a.png?sig=2"),
            "https://cdn.example.com:8443/a.png"
        );
        assert_eq!(
            canonical_key("https://cdn.example.com:443/a.png"),
            canonical_key("https://cdn.example.com/a.png")
        );
        assert_eq!(canonical_key("not a url"), "not a url");
    }

    #[test]
    fn test_publish_state_matches_resigned_urls() {
        let mut state = PublishState::new();
        assert!(state.mark_published("https://cdn.example.com/a.png?sig=1"));
        assert!(state.is_published("https://cdn.example.com/a.png?sig=2"));
        assert!(!state.mark_published("https://cdn.example.com/a.png?sig=3"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_results_by_index() {
        let submitted = batch(3);
        let response = PublishBatchResponse {
            results: vec![
                BatchItemResult {
                    index: Some(2),
                    image_url: None,
                    success: false,
                    error: Some("too large".into()),
                },
                BatchItemResult {
                    index: Some(0),
                    image_url: None,
                    success: true,
                    error: None,
                },
                BatchItemResult {
                    index: Some(1),
                    image_url: None,
                    success: true,
                    error: None,
                },
            ],
            ..Default::default()
        };

        let report = resolve_batch_outcome(&submitted, &response);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].url, submitted[2].image_url);
        assert_eq!(report.failures[0].reason, "too large");
    }

    #[test]
    fn test_results_by_url_ignore_signature() {
        let submitted = batch(2);
        let response = PublishBatchResponse {
            results: vec![BatchItemResult {
                index: None,
                image_url: Some("https://cdn.example.com/d/1.png?sig=other".into()),
                success: true,
                error: None,
            }],
            ..Default::default()
        };

        let report = resolve_batch_outcome(&submitted, &response);
        assert_eq!(report.newly_published, vec![submitted[1].image_url.clone()]);
        assert_eq!(report.failures[0].reason, "no result reported");
    }

    #[test]
    fn test_attributable_errors() {
        let submitted = batch(5);
        let response = PublishBatchResponse {
            succeeded: Some(3),
            failed: Some(2),
            errors: vec![
                BatchItemError::Detailed {
                    index: Some(1),
                    image_url: None,
                    error: Some("duplicate".into()),
                },
                BatchItemError::Detailed {
                    index: None,
                    image_url: Some(submitted[4].image_url.clone()),
                    error: None,
                },
            ],
            ..Default::default()
        };

        let report = resolve_batch_outcome(&submitted, &response);
        assert_eq!((report.succeeded, report.failed), (3, 2));
        assert_eq!(report.succeeded + report.failed, report.submitted);
    }

    #[test]
    fn test_bare_string_errors_fall_back_to_counts() {
        let submitted = batch(3);
        let response = PublishBatchResponse {
            succeeded: Some(2),
            failed: Some(1),
            errors: vec![BatchItemError::Message("quota exceeded".into())],
            ..Default::default()
        };

        let report = resolve_batch_outcome(&submitted, &response);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 3);
        assert!(report.newly_published.is_empty());
        assert_eq!(
            report.unattributed,
            Some(ReportedCounts {
                succeeded: 2,
                failed: 1
            })
        );
    }

    #[test]
    fn test_unattributed_counts_summary_keeps_service_numbers() {
        let submitted = batch(5);
        let response = PublishBatchResponse {
            succeeded: Some(3),
            failed: Some(2),
            errors: vec![
                BatchItemError::Message("a".into()),
                BatchItemError::Message("b".into()),
            ],
            ..Default::default()
        };

        let report = resolve_batch_outcome(&submitted, &response);
        assert!(report.newly_published.is_empty());
        assert_eq!(
            report.summary(),
            "Lark reported 3 of 5 designs added and 2 failed, without saying which. \
             None were marked as added."
        );
    }

    #[test]
    fn test_attributable_errors_carry_no_unattributed_counts() {
        let submitted = batch(2);
        let response = PublishBatchResponse {
            succeeded: Some(1),
            failed: Some(1),
            errors: vec![BatchItemError::Detailed {
                index: Some(0),
                image_url: None,
                error: Some("duplicate".into()),
            }],
            ..Default::default()
        };
        let report = resolve_batch_outcome(&submitted, &response);
        assert_eq!(report.unattributed, None);
        assert_eq!(
            report.summary(),
            format!(
                "Added 1 of 2 designs to Lark. 1 failed: {} (duplicate)",
                submitted[0].image_url
            )
        );
    }

    #[test]
    fn test_counts_all_good() {
        let submitted = batch(4);
        let response = PublishBatchResponse {
            succeeded: Some(4),
            failed: Some(0),
            ..Default::default()
        };
        let report = resolve_batch_outcome(&submitted, &response);
        assert_eq!(report.succeeded, 4);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_summary_lists_failures() {
        let report = BatchReport {
            submitted: 2,
            succeeded: 1,
            failed: 1,
            failures: vec![BatchFailure {
                url: "u2".into(),
                reason: "duplicate".into(),
            }],
            ..Default::default()
        };
        assert_eq!(
            report.summary(),
            "Added 1 of 2 designs to Lark. 1 failed: u2 (duplicate)"
        );
    }
}
