// Copyright 2026 Doublefetch Contributors
// SPDX-License-Identifier: Apache-2.0

//! The `doublefetch-query` job.
//!
//! One invocation covers one (query, category, url) triple:
//!
//! 1. ask the suspicion filter; rejected queries finish empty,
//! 2. claim the cooldown slot; an already-claimed slot finishes empty,
//! 3. fetch the URL anonymously (429 is permanent) and parse it,
//! 4. on fetch failure, release the slot and propagate,
//! 5. extract messages against the current pattern snapshot,
//! 6. on extraction failure, log, keep the slot, and finish empty:
//!    content-extraction bugs are not retry-worthy, and rerunning them
//!    only costs the user another fetch.

use crate::cooldown::CooldownGate;
use crate::extraction::{extract_messages, ExtractionContext};
use crate::fetch::{AnonymousHttp, FetchOptions};
use crate::messages::{Message, SendMessage};
use crate::patterns::PatternProvider;
use crate::sanitizer::Sanitizer;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name under which the job registers with the scheduler.
pub const JOB_NAME: &str = "doublefetch-query";

/// One scheduled refetch request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueryJobRequest {
    /// The query the user searched for.
    pub query: String,
    /// Pattern category identifying the target page family.
    pub category: String,
    /// The results-page URL to refetch.
    pub url: String,
    /// Fetch parameters forwarded to the anonymous client.
    #[serde(default)]
    pub fetch: FetchOptions,
}

/// What a finished job hands back to its caller.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    pub messages: Vec<Message>,
}

impl JobOutcome {
    fn empty() -> Self {
        Self::default()
    }

    /// Wrap every message in the caller-facing `send-message` envelope.
    pub fn into_envelopes(self) -> Vec<SendMessage> {
        self.messages
            .into_iter()
            .map(Message::into_envelope)
            .collect()
    }
}

/// Boxed future returned by a registered job handler.
pub type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<JobOutcome>> + Send>>;

/// Scheduler collaborator: the job registers itself under [`JOB_NAME`].
pub trait JobScheduler {
    fn register_handler(
        &mut self,
        name: &'static str,
        handler: Box<dyn Fn(QueryJobRequest) -> JobFuture + Send + Sync>,
    );
}

/// The doublefetch job, wired to its collaborators.
pub struct DoublefetchJob {
    patterns: Arc<dyn PatternProvider>,
    sanitizer: Arc<dyn Sanitizer>,
    cooldown: CooldownGate,
    http: Arc<dyn AnonymousHttp>,
}

impl DoublefetchJob {
    pub fn new(
        patterns: Arc<dyn PatternProvider>,
        sanitizer: Arc<dyn Sanitizer>,
        cooldown: CooldownGate,
        http: Arc<dyn AnonymousHttp>,
    ) -> Self {
        Self {
            patterns,
            sanitizer,
            cooldown,
            http,
        }
    }

    /// Register this job with the scheduler under [`JOB_NAME`].
    pub fn register(self: &Arc<Self>, scheduler: &mut dyn JobScheduler) {
        let job = Arc::clone(self);
        scheduler.register_handler(
            JOB_NAME,
            Box::new(move |request| {
                let job = Arc::clone(&job);
                Box::pin(async move { job.run(request).await })
            }),
        );
    }

    /// Run one refetch-and-extract cycle.
    pub async fn run(&self, request: QueryJobRequest) -> anyhow::Result<JobOutcome> {
        let check = self.sanitizer.check_suspicious_query(&request.query);
        if !check.accept {
            debug!(
                category = %request.category,
                reason = check.reason.as_deref().unwrap_or("unspecified"),
                "query rejected by suspicion filter"
            );
            return Ok(JobOutcome::empty());
        }

        if !self.cooldown.try_acquire(&request.category, &request.query) {
            debug!(category = %request.category, "cooldown active, skipping refetch");
            return Ok(JobOutcome::empty());
        }

        let mut options = request.fetch.clone();
        options.treat_429_as_permanent = true;

        let body = match self.http.get(&request.url, &options).await {
            Ok(body) => body,
            Err(err) => {
                // Release the slot so the scheduler may retry later today.
                self.cooldown.release(&request.category, &request.query);
                warn!(
                    category = %request.category,
                    permanent = err.is_permanent(),
                    error = %err,
                    "fetch failed, cooldown slot released"
                );
                return Err(err.into());
            }
        };

        let context = ExtractionContext {
            query: request.query.clone(),
            url: request.url.clone(),
            country: self.sanitizer.safe_country_code(),
        };
        let snapshot = self.patterns.rules_snapshot();

        match extract_messages(&body, &snapshot, &request.category, &context) {
            Ok(messages) => {
                debug!(
                    category = %request.category,
                    count = messages.len(),
                    "extraction finished"
                );
                Ok(JobOutcome { messages })
            }
            Err(err) => {
                // Keep the slot: an unsupported pattern or a rate-limiting
                // page will not improve within the day.
                warn!(
                    category = %request.category,
                    permanent = err.is_permanent(),
                    error = %err,
                    "extraction failed, cooldown slot kept"
                );
                Ok(JobOutcome::empty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::fetch::FetchOptions;
    use crate::patterns::StaticPatterns;
    use crate::sanitizer::BasicSanitizer;
    use crate::store::{MemoryHashes, PersistedHashes};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeHttp {
        response: Mutex<Option<Result<String>>>,
        seen_options: Mutex<Option<FetchOptions>>,
    }

    impl FakeHttp {
        fn returning(response: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                seen_options: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl AnonymousHttp for FakeHttp {
        async fn get(&self, _url: &str, options: &FetchOptions) -> Result<String> {
            *self.seen_options.lock().unwrap() = Some(options.clone());
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn patterns() -> Arc<StaticPatterns> {
        let set = json!({
            "test-category": {
                "input": {
                    "html > body": {
                        "first": {"title": {"select": "h1", "attr": "textContent"}}
                    }
                },
                "output": {
                    "test-action": {
                        "fields": [
                            {"key": "title", "source": "html > body"},
                            {"key": "q"},
                            {"key": "ctry"}
                        ]
                    }
                }
            }
        });
        Arc::new(StaticPatterns::from_json(&set.to_string()).unwrap())
    }

    fn request() -> QueryJobRequest {
        QueryJobRequest {
            query: "rust html parser".into(),
            category: "test-category".into(),
            url: "http://example.test/x?q=rust+html+parser".into(),
            fetch: FetchOptions::default(),
        }
    }

    fn job(http: Arc<dyn AnonymousHttp>, store: Arc<dyn PersistedHashes>) -> DoublefetchJob {
        DoublefetchJob::new(
            patterns(),
            Arc::new(BasicSanitizer::new("de")),
            CooldownGate::new(store),
            http,
        )
    }

    #[tokio::test]
    async fn test_successful_run_emits_messages() {
        let http = FakeHttp::returning(Ok("<html><body><h1>Hit</h1></body></html>".into()));
        let job = job(http.clone(), Arc::new(MemoryHashes::new()));

        let outcome = job.run(request()).await.unwrap();
        assert_eq!(outcome.messages.len(), 1);
        let payload = &outcome.messages[0].body.payload;
        assert_eq!(payload["title"], json!("Hit"));
        assert_eq!(payload["q"], json!("rust html parser"));
        assert_eq!(payload["ctry"], json!("de"));

        // 429 classification is forced regardless of the request.
        let seen = http.seen_options.lock().unwrap().clone().unwrap();
        assert!(seen.treat_429_as_permanent);
    }

    #[tokio::test]
    async fn test_suspicious_query_finishes_empty_without_cooldown() {
        let store = Arc::new(MemoryHashes::new());
        let http = FakeHttp::returning(Ok("<html></html>".into()));
        let job = job(http, store.clone());

        let mut req = request();
        req.query = "jane.doe@example.com".into();
        let outcome = job.run(req.clone()).await.unwrap();
        assert!(outcome.messages.is_empty());

        // The slot was never claimed.
        assert!(CooldownGate::new(store).try_acquire(&req.category, &req.query));
    }

    #[tokio::test]
    async fn test_second_run_same_day_is_gated() {
        let store = Arc::new(MemoryHashes::new());
        let http = FakeHttp::returning(Ok("<html><body><h1>Hit</h1></body></html>".into()));
        let job = job(http, store);

        assert_eq!(job.run(request()).await.unwrap().messages.len(), 1);
        assert!(job.run(request()).await.unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_releases_fingerprint_and_propagates() {
        let store = Arc::new(MemoryHashes::new());
        let http = FakeHttp::returning(Err(Error::Fetch("connection reset".into())));
        let job = job(http, store.clone());

        assert!(job.run(request()).await.is_err());

        // Slot released: a later run may claim it again.
        let req = request();
        assert!(CooldownGate::new(store).try_acquire(&req.category, &req.query));
    }

    #[tokio::test]
    async fn test_permanent_http_also_releases_fingerprint() {
        let store = Arc::new(MemoryHashes::new());
        let http = FakeHttp::returning(Err(Error::PermanentHttp(429)));
        let job = job(http, store.clone());

        let err = job.run(request()).await.unwrap_err();
        let err = err.downcast::<Error>().unwrap();
        assert!(err.is_permanent());

        let req = request();
        assert!(CooldownGate::new(store).try_acquire(&req.category, &req.query));
    }

    #[tokio::test]
    async fn test_extraction_failure_is_swallowed_and_keeps_fingerprint() {
        let set = json!({
            "test-category": {
                "input": {
                    "html > body": {
                        "first": {
                            "title": {"select": "h1", "attr": "textContent",
                                      "transform": [["thisBuiltinDoesNotExist"]]}
                        }
                    }
                },
                "output": {
                    "test-action": {"fields": [{"key": "title", "source": "html > body"}]}
                }
            }
        });
        let store = Arc::new(MemoryHashes::new());
        let http = FakeHttp::returning(Ok("<html><body><h1>Hit</h1></body></html>".into()));
        let job = DoublefetchJob::new(
            Arc::new(StaticPatterns::from_json(&set.to_string()).unwrap()),
            Arc::new(BasicSanitizer::new("de")),
            CooldownGate::new(store.clone()),
            http,
        );

        let outcome = job.run(request()).await.unwrap();
        assert!(outcome.messages.is_empty());

        // Slot kept: no retry within the day.
        let req = request();
        assert!(!CooldownGate::new(store).try_acquire(&req.category, &req.query));
    }

    #[tokio::test]
    async fn test_unknown_category_finishes_empty() {
        let http = FakeHttp::returning(Ok("<html><body><h1>Hit</h1></body></html>".into()));
        let job = job(http, Arc::new(MemoryHashes::new()));

        let mut req = request();
        req.category = "unconfigured".into();
        let outcome = job.run(req).await.unwrap();
        assert!(outcome.messages.is_empty());
    }

    #[test]
    fn test_registration_uses_job_name() {
        struct Recorder {
            name: Option<&'static str>,
        }
        impl JobScheduler for Recorder {
            fn register_handler(
                &mut self,
                name: &'static str,
                _handler: Box<dyn Fn(QueryJobRequest) -> JobFuture + Send + Sync>,
            ) {
                self.name = Some(name);
            }
        }

        let job = Arc::new(DoublefetchJob::new(
            patterns(),
            Arc::new(BasicSanitizer::new("de")),
            CooldownGate::new(Arc::new(MemoryHashes::new())),
            FakeHttp::returning(Ok(String::new())),
        ));
        let mut scheduler = Recorder { name: None };
        job.register(&mut scheduler);
        assert_eq!(scheduler.name, Some("doublefetch-query"));
    }
}
