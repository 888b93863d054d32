//! Best-effort submission dispatch to external sinks.
//!
//! Local persistence is unconditional and happens first; every configured
//! sink then fires concurrently and fails independently. Sink failures are
//! logged, counted and otherwise swallowed — the overall result reflects
//! local persistence only.

use std::sync::Arc;

use futures::future::join_all;
use reqwest::header::ACCEPT;
use reqwest::multipart;
use tracing::{error, info, warn};

use crate::config::SinksConfig;
use crate::error::{VerbenaError, VerbenaResult};
use crate::store::RegistrationStore;
use crate::types::RsvpRecord;

/// Default form relay endpoint the invitation shipped with
pub const DEFAULT_FORM_RELAY_URL: &str = "https://formspree.io/f/mkgvevpw";

/// An external endpoint that may receive a copy of a submitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionSink {
    /// Multipart form relay; fields `name`, `date`, `time`, `timestamp`
    FormRelay { url: String },
    /// Generic JSON webhook
    Webhook { url: String },
}

impl SubmissionSink {
    /// Sinks enabled by `config`, in a fixed order.
    pub fn from_config(config: &SinksConfig) -> Vec<Self> {
        let mut sinks = Vec::new();
        if let Some(url) = &config.form_relay_url {
            sinks.push(Self::FormRelay { url: url.clone() });
        }
        if let Some(url) = &config.webhook_url {
            sinks.push(Self::Webhook { url: url.clone() });
        }
        sinks
    }

    fn label(&self) -> &'static str {
        match self {
            Self::FormRelay { .. } => "form-relay",
            Self::Webhook { .. } => "webhook",
        }
    }
}

/// Outcome of one submission, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub local_ok: bool,
    pub sinks_succeeded: usize,
    pub sinks_total: usize,
}

impl DispatchOutcome {
    /// The record is safe on disk but no external sink accepted it.
    pub fn saved_locally_only(&self) -> bool {
        self.local_ok && self.sinks_total > 0 && self.sinks_succeeded == 0
    }
}

/// Persists registrations locally and forwards them to external sinks.
pub struct SubmissionDispatcher {
    store: Arc<RegistrationStore>,
    sinks: Vec<SubmissionSink>,
    client: reqwest::Client,
}

impl SubmissionDispatcher {
    pub fn new(store: Arc<RegistrationStore>, sinks: Vec<SubmissionSink>) -> Self {
        Self {
            store,
            sinks,
            client: reqwest::Client::new(),
        }
    }

    pub fn sinks(&self) -> &[SubmissionSink] {
        &self.sinks
    }

    /// Submit `name`: persist locally, then fan out to every sink.
    ///
    /// Returns `true` whenever the local record succeeded, regardless of how
    /// many sinks accepted the copy; `false` only when persistence itself
    /// failed.
    pub async fn submit(&self, name: &str) -> bool {
        self.dispatch(name).await.local_ok
    }

    /// Like [`submit`](Self::submit), with per-phase detail.
    pub async fn dispatch(&self, name: &str) -> DispatchOutcome {
        let record = match self.store.record(name) {
            Ok(record) => record,
            Err(err) => {
                error!(%err, "registration could not be persisted");
                return DispatchOutcome {
                    local_ok: false,
                    sinks_succeeded: 0,
                    sinks_total: self.sinks.len(),
                };
            }
        };

        let results = join_all(self.sinks.iter().map(|sink| self.send(sink, &record))).await;
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        info!(
            succeeded,
            total = self.sinks.len(),
            "external sink dispatch finished"
        );

        DispatchOutcome {
            local_ok: true,
            sinks_succeeded: succeeded,
            sinks_total: self.sinks.len(),
        }
    }

    async fn send(&self, sink: &SubmissionSink, record: &RsvpRecord) -> VerbenaResult<()> {
        let response = match sink {
            SubmissionSink::FormRelay { url } => {
                let form = multipart::Form::new()
                    .text("name", record.name.clone())
                    .text("date", record.date.clone())
                    .text("time", record.time.clone())
                    .text("timestamp", record.timestamp.to_rfc3339());
                self.client
                    .post(url)
                    .header(ACCEPT, "application/json")
                    .multipart(form)
                    .send()
                    .await
            }
            SubmissionSink::Webhook { url } => {
                let payload = serde_json::json!({
                    "event": "birthday_rsvp",
                    "name": record.name,
                    "timestamp": record.timestamp.to_rfc3339(),
                    "date": record.date,
                    "time": record.time,
                    "source": "birthday_invitation",
                });
                self.client.post(url).json(&payload).send().await
            }
        };

        match response {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                warn!(sink = sink.label(), status = %response.status(), "sink rejected submission");
                Err(VerbenaError::Sink(format!(
                    "{} returned {}",
                    sink.label(),
                    response.status()
                )))
            }
            Err(err) => {
                warn!(sink = sink.label(), %err, "sink unreachable");
                Err(VerbenaError::Sink(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> Arc<RegistrationStore> {
        Arc::new(RegistrationStore::new(dir.path().join("test.redb")).unwrap())
    }

    #[test]
    fn test_default_config_enables_only_the_form_relay() {
        let sinks = SubmissionSink::from_config(&SinksConfig::default());
        assert_eq!(
            sinks,
            vec![SubmissionSink::FormRelay {
                url: DEFAULT_FORM_RELAY_URL.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_submit_succeeds_with_no_sinks_configured() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let dispatcher = SubmissionDispatcher::new(Arc::clone(&store), Vec::new());

        assert!(dispatcher.submit("Ana").await);
        let records = store.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ana");
    }

    #[tokio::test]
    async fn test_unreachable_sink_does_not_fail_the_submission() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        // Discard port: connection refused without leaving the machine.
        let dispatcher = SubmissionDispatcher::new(
            Arc::clone(&store),
            vec![
                SubmissionSink::FormRelay {
                    url: "http://127.0.0.1:9/relay".to_string(),
                },
                SubmissionSink::Webhook {
                    url: "http://127.0.0.1:9/hook".to_string(),
                },
            ],
        );

        let outcome = dispatcher.dispatch("Ana").await;
        assert!(outcome.local_ok);
        assert_eq!(outcome.sinks_succeeded, 0);
        assert_eq!(outcome.sinks_total, 2);
        assert!(outcome.saved_locally_only());

        let records = store.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ana");
    }

    #[tokio::test]
    async fn test_invalid_name_fails_before_any_sink_fires() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let dispatcher = SubmissionDispatcher::new(
            Arc::clone(&store),
            vec![SubmissionSink::Webhook {
                url: "http://127.0.0.1:9/hook".to_string(),
            }],
        );

        let outcome = dispatcher.dispatch("   ").await;
        assert!(!outcome.local_ok);
        assert_eq!(outcome.sinks_succeeded, 0);
        assert!(store.list().is_empty());
        assert!(!dispatcher.submit("   ").await);
    }
}
