//! Oracle gateway
//!
//! Every reasoning request made by the research engine goes through
//! [`OracleGateway::invoke`]. The gateway checks the shared
//! [`ResponseCache`] first, and on a miss dispatches to the configured model
//! rotation:
//!
//! 1. try the current model up to `attempts_per_model` times, pausing
//!    `retry_pause` between attempts;
//! 2. rotate to the next model (wrapping), pause `rotation_pause`, repeat;
//! 3. give up with [`AppError::LLM`] after `max_rotations` full passes over
//!    the rotation, or never when the cap is `None`.
//!
//! Structured requests are parsed with [`repair::parse_lenient`]; output
//! that cannot be recovered counts as a failed attempt. With
//! [`OracleGateway::invoke_as`] so does output that parses but does not
//! decode into the caller's type. Only accepted replies are cached.
//!
//! The model that last succeeded stays current for subsequent requests, so a
//! flaky model is skipped by every session once it has been rotated away from.

pub mod repair;

use crate::cache::{ResponseCache, compute_key};
use crate::llm::{LLMClient, RotationSlot};
use crate::types::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One reasoning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub system: String,
    pub user: String,
    /// Parse the reply as JSON
    pub structured: bool,
}

impl OracleRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            structured: false,
        }
    }

    pub fn structured(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            structured: true,
        }
    }

    /// Cache key over the full request. The model is deliberately absent:
    /// any model's answer to the same prompt satisfies the request.
    pub fn cache_key(&self) -> String {
        let mode = if self.structured { "structured" } else { "text" };
        compute_key("oracle", &[&self.system, &self.user, mode])
    }
}

/// A successful reply. `parsed` is set for structured requests only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub raw_text: String,
    pub parsed: Option<Value>,
}

/// Retry and rotation behaviour for oracle dispatch.
///
/// `retry_pause` separates attempts on the same model only; after a model's
/// last failed attempt the gateway goes straight to `rotation_pause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts_per_model: u32,
    pub retry_pause: Duration,
    pub rotation_pause: Duration,
    /// Full passes over the rotation before giving up; `None` never gives up
    pub max_rotations: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts_per_model: 2,
            retry_pause: Duration::from_secs(30),
            rotation_pause: Duration::from_secs(5),
            max_rotations: Some(3),
        }
    }
}

impl RetryPolicy {
    /// Same attempt counts with no pauses.
    pub fn without_pauses(self) -> Self {
        Self {
            retry_pause: Duration::ZERO,
            rotation_pause: Duration::ZERO,
            ..self
        }
    }
}

/// Cache-fronted, retrying access to an ordered list of models.
///
/// Shared by reference across all sessions of a process.
pub struct OracleGateway {
    slots: Vec<RotationSlot>,
    current: AtomicUsize,
    policy: RetryPolicy,
    cache: Arc<ResponseCache>,
    dispatches: AtomicU64,
}

impl OracleGateway {
    pub fn new(
        slots: Vec<RotationSlot>,
        policy: RetryPolicy,
        cache: Arc<ResponseCache>,
    ) -> Result<Self> {
        if slots.is_empty() {
            return Err(AppError::Config(
                "Oracle gateway needs at least one model".to_string(),
            ));
        }
        if policy.attempts_per_model == 0 {
            return Err(AppError::Config(
                "attempts_per_model must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            slots,
            current: AtomicUsize::new(0),
            policy,
            cache,
            dispatches: AtomicU64::new(0),
        })
    }

    /// Answer `request`, from cache when possible.
    pub async fn invoke(&self, request: &OracleRequest) -> Result<OracleResponse> {
        self.invoke_checked(request, &|_| Ok(())).await
    }

    /// Answer a structured `request` decoded as `T`.
    ///
    /// A reply that parses as JSON but does not decode as `T` counts as a
    /// failed attempt, so it is retried and never cached.
    pub async fn invoke_as<T: DeserializeOwned>(&self, request: &OracleRequest) -> Result<T> {
        let response = self
            .invoke_checked(request, &|response| decode::<T>(response).map(drop))
            .await?;
        decode(&response)
    }

    async fn invoke_checked(
        &self,
        request: &OracleRequest,
        check: &(dyn Fn(&OracleResponse) -> Result<()> + Sync),
    ) -> Result<OracleResponse> {
        let key = request.cache_key();

        if let Some(cached) = self.cache.get(&key).await {
            match serde_json::from_value::<OracleResponse>(cached) {
                Ok(response) => match check(&response) {
                    Ok(()) => {
                        debug!(structured = request.structured, "Oracle cache hit");
                        return Ok(response);
                    }
                    Err(e) => warn!(error = %e, "Ignoring cached oracle response of unexpected shape"),
                },
                Err(e) => warn!(error = %e, "Ignoring unreadable cached oracle response"),
            }
        }

        let response = self.dispatch(request, check).await?;

        match serde_json::to_value(&response) {
            Ok(value) => self.cache.put(&key, value),
            Err(e) => warn!(error = %e, "Failed to serialize oracle response for caching"),
        }

        Ok(response)
    }

    async fn dispatch(
        &self,
        request: &OracleRequest,
        check: &(dyn Fn(&OracleResponse) -> Result<()> + Sync),
    ) -> Result<OracleResponse> {
        let len = self.slots.len();
        let mut index = self.current.load(Ordering::Relaxed) % len;
        let mut models_exhausted: u64 = 0;
        let mut last_error = String::new();

        loop {
            let (name, client) = &self.slots[index];

            for attempt in 1..=self.policy.attempts_per_model {
                self.dispatches.fetch_add(1, Ordering::Relaxed);
                let outcome = self
                    .attempt(client.as_ref(), request)
                    .await
                    .and_then(|response| check(&response).map(|()| response));
                match outcome {
                    Ok(response) => {
                        self.current.store(index, Ordering::Relaxed);
                        return Ok(response);
                    }
                    Err(e) => {
                        warn!(model = %name, attempt, error = %e, "Oracle dispatch failed");
                        last_error = e.to_string();
                        if attempt < self.policy.attempts_per_model {
                            tokio::time::sleep(self.policy.retry_pause).await;
                        }
                    }
                }
            }

            models_exhausted += 1;
            if let Some(max) = self.policy.max_rotations
                && models_exhausted >= u64::from(max) * len as u64
            {
                return Err(AppError::LLM(format!(
                    "All {} model(s) failed after {} rotation(s); last error: {}",
                    len, max, last_error
                )));
            }

            index = (index + 1) % len;
            self.current.store(index, Ordering::Relaxed);
            info!(model = %self.slots[index].0, "Rotating oracle to next model");
            tokio::time::sleep(self.policy.rotation_pause).await;
        }
    }

    async fn attempt(
        &self,
        client: &dyn LLMClient,
        request: &OracleRequest,
    ) -> Result<OracleResponse> {
        let raw_text = client
            .generate_with_system(&request.system, &request.user)
            .await?;

        let parsed = if request.structured {
            let value = repair::parse_lenient(&raw_text).ok_or_else(|| {
                AppError::LLM(format!(
                    "{} returned unparseable structured output",
                    client.model_name()
                ))
            })?;
            Some(value)
        } else {
            None
        };

        Ok(OracleResponse { raw_text, parsed })
    }

    /// Name of the model the next dispatch starts with
    pub fn current_model(&self) -> &str {
        let index = self.current.load(Ordering::Relaxed) % self.slots.len();
        &self.slots[index].0
    }

    /// Make `name` the current model.
    pub fn select_model(&self, name: &str) -> Result<()> {
        let index = self
            .slots
            .iter()
            .position(|(slot, _)| slot == name)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Unknown model '{}'; rotation is [{}]",
                    name,
                    self.rotation().join(", ")
                ))
            })?;
        self.current.store(index, Ordering::Relaxed);
        Ok(())
    }

    /// Model names in rotation order
    pub fn rotation(&self) -> Vec<String> {
        self.slots.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Total model invocations made so far, cache hits excluded
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}

fn decode<T: DeserializeOwned>(response: &OracleResponse) -> Result<T> {
    let value = response
        .parsed
        .clone()
        .ok_or_else(|| AppError::LLM("Structured reply missing parsed value".to_string()))?;
    serde_json::from_value(value).map_err(|e| AppError::LLM(format!("Unexpected reply shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replies from a script; an exhausted script fails every call.
    struct Scripted {
        name: String,
        replies: Mutex<VecDeque<Result<String>>>,
        calls: AtomicU64,
    }

    impl Scripted {
        fn new(name: &str, replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                replies: Mutex::new(replies.into()),
                calls: AtomicU64::new(0),
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LLMClient for Scripted {
        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::LLM("script exhausted".to_string())))
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }

    fn fail() -> Result<String> {
        Err(AppError::LLM("boom".to_string()))
    }

    fn gateway(slots: Vec<(&str, Arc<Scripted>)>, max_rotations: Option<u32>) -> OracleGateway {
        let slots = slots
            .into_iter()
            .map(|(name, client)| (name.to_string(), client as Arc<dyn LLMClient>))
            .collect();
        let policy = RetryPolicy {
            max_rotations,
            ..RetryPolicy::default()
        }
        .without_pauses();
        OracleGateway::new(slots, policy, Arc::new(ResponseCache::in_memory())).unwrap()
    }

    #[tokio::test]
    async fn test_second_invoke_is_served_from_cache() {
        let model = Scripted::new("a", vec![Ok("hello".to_string())]);
        let gw = gateway(vec![("a", model.clone())], Some(1));
        let request = OracleRequest::text("sys", "user");

        let first = gw.invoke(&request).await.unwrap();
        let second = gw.invoke(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.raw_text, "hello");
        assert_eq!(model.calls(), 1);
        assert_eq!(gw.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn test_structured_flag_is_part_of_key() {
        assert_ne!(
            OracleRequest::text("s", "u").cache_key(),
            OracleRequest::structured("s", "u").cache_key()
        );
        assert_ne!(
            OracleRequest::text("s1", "u").cache_key(),
            OracleRequest::text("s2", "u").cache_key()
        );
    }

    #[tokio::test]
    async fn test_retries_same_model_before_rotating() {
        let a = Scripted::new("a", vec![fail(), Ok("second try".to_string())]);
        let b = Scripted::new("b", vec![Ok("never".to_string())]);
        let gw = gateway(vec![("a", a.clone()), ("b", b.clone())], Some(1));

        let response = gw.invoke(&OracleRequest::text("s", "u")).await.unwrap();

        assert_eq!(response.raw_text, "second try");
        assert_eq!(a.calls(), 2);
        assert_eq!(b.calls(), 0);
        assert_eq!(gw.current_model(), "a");
    }

    #[tokio::test]
    async fn test_rotates_after_two_failures_and_stays_rotated() {
        let a = Scripted::new("a", vec![fail(), fail()]);
        let b = Scripted::new("b", vec![Ok("from b".to_string()), Ok("b again".to_string())]);
        let gw = gateway(vec![("a", a.clone()), ("b", b.clone())], Some(1));

        let response = gw.invoke(&OracleRequest::text("s", "u1")).await.unwrap();
        assert_eq!(response.raw_text, "from b");
        assert_eq!(gw.current_model(), "b");

        gw.invoke(&OracleRequest::text("s", "u2")).await.unwrap();
        assert_eq!(a.calls(), 2);
        assert_eq!(b.calls(), 2);
    }

    #[tokio::test]
    async fn test_rotation_wraps_around() {
        let a = Scripted::new("a", vec![Ok("a recovers".to_string())]);
        let b = Scripted::new("b", vec![fail(), fail()]);
        let gw = gateway(vec![("a", a.clone()), ("b", b.clone())], Some(2));
        gw.select_model("b").unwrap();

        let response = gw.invoke(&OracleRequest::text("s", "u")).await.unwrap();
        assert_eq!(response.raw_text, "a recovers");
        assert_eq!(gw.current_model(), "a");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_rotations() {
        let a = Scripted::new("a", vec![]);
        let b = Scripted::new("b", vec![]);
        let gw = gateway(vec![("a", a.clone()), ("b", b.clone())], Some(2));

        let err = gw.invoke(&OracleRequest::text("s", "u")).await.unwrap_err();

        assert!(matches!(err, AppError::LLM(ref msg) if msg.contains("2 rotation")));
        assert_eq!(a.calls(), 4);
        assert_eq!(b.calls(), 4);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let a = Scripted::new("a", vec![fail(), fail(), Ok("later".to_string())]);
        let gw = gateway(vec![("a", a.clone())], Some(1));
        let request = OracleRequest::text("s", "u");

        assert!(gw.invoke(&request).await.is_err());
        assert_eq!(gw.invoke(&request).await.unwrap().raw_text, "later");
    }

    #[tokio::test]
    async fn test_unparseable_structured_reply_is_retried() {
        let a = Scripted::new(
            "a",
            vec![
                Ok("I am not JSON at all".to_string()),
                Ok("```json\n{\"relevance\": 9,}\n```".to_string()),
            ],
        );
        let gw = gateway(vec![("a", a.clone())], Some(1));

        let response = gw
            .invoke(&OracleRequest::structured("s", "u"))
            .await
            .unwrap();

        assert_eq!(response.parsed, Some(serde_json::json!({"relevance": 9})));
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_pause_only_between_attempts() {
        let a = Scripted::new("a", vec![fail(), fail()]);
        let b = Scripted::new("b", vec![Ok("from b".to_string())]);
        let slots = vec![
            ("a".to_string(), a.clone() as Arc<dyn LLMClient>),
            ("b".to_string(), b.clone() as Arc<dyn LLMClient>),
        ];
        let policy = RetryPolicy {
            attempts_per_model: 2,
            retry_pause: Duration::from_millis(300),
            rotation_pause: Duration::ZERO,
            max_rotations: Some(1),
        };
        let gw = OracleGateway::new(slots, policy, Arc::new(ResponseCache::in_memory())).unwrap();

        let started = std::time::Instant::now();
        gw.invoke(&OracleRequest::text("s", "u")).await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(550), "took {:?}", elapsed);
        assert_eq!(b.calls(), 1);
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Plan {
        full_question: String,
    }

    #[tokio::test]
    async fn test_misshaped_reply_is_retried_and_not_cached() {
        let a = Scripted::new(
            "a",
            vec![
                Ok(r#"{"full_question": null}"#.to_string()),
                Ok(r#"{"full_question": "Why static types?"}"#.to_string()),
            ],
        );
        let gw = gateway(vec![("a", a.clone())], Some(1));
        let request = OracleRequest::structured("s", "u");

        let first: Plan = gw.invoke_as(&request).await.unwrap();
        let second: Plan = gw.invoke_as(&request).await.unwrap();

        assert_eq!(first.full_question, "Why static types?");
        assert_eq!(first, second);
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test]
    async fn test_misshaped_reply_exhausts_to_error() {
        let a = Scripted::new(
            "a",
            vec![
                Ok(r#"{"full_question": 3}"#.to_string()),
                Ok(r#"{"full_question": null}"#.to_string()),
            ],
        );
        let gw = gateway(vec![("a", a.clone())], Some(1));
        let request = OracleRequest::structured("s", "u");

        let err = gw.invoke_as::<Plan>(&request).await.unwrap_err();
        assert!(matches!(err, AppError::LLM(ref msg) if msg.contains("Unexpected reply shape")));
        assert!(gw.cache().get(&request.cache_key()).await.is_none());
    }

    #[tokio::test]
    async fn test_cached_reply_of_wrong_shape_is_redispatched() {
        let a = Scripted::new("a", vec![Ok(r#"{"full_question": "fresh"}"#.to_string())]);
        let gw = gateway(vec![("a", a.clone())], Some(1));
        let request = OracleRequest::structured("s", "u");
        let stale = OracleResponse {
            raw_text: "{}".to_string(),
            parsed: Some(serde_json::json!({"full_question": null})),
        };
        gw.cache()
            .put(&request.cache_key(), serde_json::to_value(stale).unwrap());

        let plan: Plan = gw.invoke_as(&request).await.unwrap();

        assert_eq!(plan.full_question, "fresh");
        assert_eq!(a.calls(), 1);
        let cached: OracleResponse =
            serde_json::from_value(gw.cache().get(&request.cache_key()).await.unwrap()).unwrap();
        assert_eq!(cached.parsed, Some(serde_json::json!({"full_question": "fresh"})));
    }

    #[tokio::test]
    async fn test_select_unknown_model() {
        let a = Scripted::new("a", vec![]);
        let gw = gateway(vec![("a", a)], Some(1));
        assert!(matches!(
            gw.select_model("zzz"),
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(gw.rotation(), vec!["a"]);
    }

    #[test]
    fn test_empty_rotation_rejected() {
        let result = OracleGateway::new(
            Vec::new(),
            RetryPolicy::default(),
            Arc::new(ResponseCache::in_memory()),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
