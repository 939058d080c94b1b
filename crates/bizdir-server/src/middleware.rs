//! Request plumbing shared by the routers: correlation ids, bearer-key
//! auth and a process-wide request budget.
//!
//! Rejections use the same [`ApiError`] envelope as the handlers, carrying
//! the request id assigned by [`request_id`].

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::{Choice, ConstantTimeEq};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Client-supplied ids longer than this are replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

const API_KEYS_VAR: &str = "BIZDIR_API_KEYS";

/// Correlation id for one request, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse the caller's `x-request-id` when it is short printable ASCII,
    /// otherwise mint a fresh UUID.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| is_usable_request_id(id))
            .map_or_else(Self::generate, |id| Self(id.to_string()))
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_usable_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id.bytes().all(|b| b.is_ascii_graphic())
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(|| RequestId::generate().0, |id| id.0.clone())
}

/// Bearer-key policy for the protected routes.
///
/// `None` keys means auth is off, which is only allowed in development.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Option<Arc<[String]>>,
}

impl AuthState {
    /// Read comma-separated keys from `BIZDIR_API_KEYS`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no key is configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    pub(crate) fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        keys.sort_unstable();
        keys.dedup();

        match (keys.is_empty(), is_development) {
            (false, _) => {
                tracing::info!(keys = keys.len(), "bearer auth enabled");
                Ok(Self {
                    keys: Some(keys.into()),
                })
            }
            (true, true) => {
                tracing::warn!("{API_KEYS_VAR} is empty; bearer auth is off for development");
                Ok(Self::disabled())
            }
            (true, false) => anyhow::bail!(
                "{API_KEYS_VAR} must list at least one bearer key outside development"
            ),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self { keys: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    /// Compares against every key so timing does not reveal which one matched.
    fn admits(&self, token: &str) -> bool {
        let Some(keys) = &self.keys else {
            return true;
        };
        keys.iter()
            .fold(Choice::from(0), |hit, key| {
                hit | key.as_bytes().ct_eq(token.as_bytes())
            })
            .into()
    }
}

/// Fixed-window request budget shared by every protected route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    budget: usize,
    window: Duration,
    current: Arc<Mutex<Window>>,
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    used: usize,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: usize, window: Duration) -> Self {
        Self {
            budget,
            window,
            current: Arc::new(Mutex::new(Window {
                opened: Instant::now(),
                used: 0,
            })),
        }
    }

    /// Spend one unit of the budget at `now`.
    ///
    /// Returns how long until the window reopens when the budget is gone.
    pub async fn try_acquire(&self, now: Instant) -> Result<(), Duration> {
        let mut current = self.current.lock().await;
        let mut age = now.saturating_duration_since(current.opened);
        if age >= self.window {
            *current = Window {
                opened: now,
                used: 0,
            };
            age = Duration::ZERO;
        }
        if current.used >= self.budget {
            return Err(self.window - age);
        }
        current.used += 1;
        Ok(())
    }
}

/// Attach a [`RequestId`] to the request and echo it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId::from_headers(req.headers());
    let header = HeaderValue::from_str(id.as_str()).ok();
    req.extensions_mut().insert(id);

    let mut res = next.run(req).await;
    if let Some(value) = header {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Reject requests without a configured bearer key.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.is_enabled() {
        return next.run(req).await;
    }
    if bearer_token(req.headers()).is_some_and(|token| auth.admits(token)) {
        return next.run(req).await;
    }

    tracing::debug!(path = %req.uri().path(), "rejected request without valid bearer key");
    ApiError::new(
        request_id_of(&req),
        "unauthorized",
        "missing or invalid bearer token",
    )
    .into_response()
}

/// Answer 429 with `Retry-After` once the window's budget is spent.
pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let Err(wait) = limit.try_acquire(Instant::now()).await else {
        return next.run(req).await;
    };

    let retry_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    tracing::warn!(retry_secs, "request budget exhausted");
    let mut res = ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
        .into_response();
    res.headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_secs.max(1)));
    res
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: HeaderName, value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(
            bearer_token(&headers(AUTHORIZATION, "Bearer k1")),
            Some("k1")
        );
        assert_eq!(
            bearer_token(&headers(AUTHORIZATION, "bearer  k2 ")),
            Some("k2")
        );
    }

    #[test]
    fn other_schemes_and_blank_tokens_yield_nothing() {
        assert_eq!(bearer_token(&headers(AUTHORIZATION, "Basic abc123")), None);
        assert_eq!(bearer_token(&headers(AUTHORIZATION, "Bearer   ")), None);
        assert_eq!(bearer_token(&headers(AUTHORIZATION, "Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn caller_request_id_is_kept_when_printable() {
        let id = RequestId::from_headers(&headers(REQUEST_ID_HEADER, "req-42"));
        assert_eq!(id.as_str(), "req-42");
    }

    #[test]
    fn unusable_request_id_is_replaced() {
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let mut map = HeaderMap::new();
        map.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_str(&long).expect("ascii header"),
        );
        let id = RequestId::from_headers(&map);
        assert_ne!(id.as_str(), long);
        assert!(Uuid::parse_str(id.as_str()).is_ok());

        let spaced = RequestId::from_headers(&headers(REQUEST_ID_HEADER, "a b"));
        assert!(Uuid::parse_str(spaced.as_str()).is_ok());

        let missing = RequestId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(missing.as_str()).is_ok());
    }

    #[test]
    fn blank_keys_turn_auth_off_only_in_development() {
        let dev = AuthState::from_keys(" , ", true).expect("development allows no keys");
        assert!(!dev.is_enabled());
        assert!(dev.admits("anything"));

        assert!(AuthState::from_keys("", false).is_err());
    }

    #[test]
    fn only_configured_keys_are_admitted() {
        let auth = AuthState::from_keys("alpha, beta,alpha", false).expect("keys");
        assert!(auth.is_enabled());
        assert!(auth.admits("alpha"));
        assert!(auth.admits("beta"));
        assert!(!auth.admits("alph"));
        assert!(!auth.admits("gamma"));
    }

    #[tokio::test]
    async fn budget_is_spent_then_refilled_by_the_next_window() {
        let limit = RateLimitState::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limit.try_acquire(start).await.is_ok());
        assert!(limit.try_acquire(start).await.is_ok());
        let wait = limit
            .try_acquire(start + Duration::from_secs(15))
            .await
            .expect_err("budget spent");
        assert!(wait <= Duration::from_secs(45));
        assert!(wait > Duration::from_secs(44));

        assert!(limit.try_acquire(start + Duration::from_secs(60)).await.is_ok());
    }

    #[tokio::test]
    async fn zero_budget_rejects_everything_in_window() {
        let limit = RateLimitState::new(0, Duration::from_secs(1));
        let start = Instant::now();
        assert!(limit.try_acquire(start).await.is_err());
        let wait = limit
            .try_acquire(start + Duration::from_secs(2))
            .await
            .expect_err("a fresh window has no budget either");
        assert_eq!(wait, Duration::from_secs(1));
    }
}
