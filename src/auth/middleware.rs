use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, warn};

use crate::auth::{extract_bearer_token, AuthError, AuthService, UserRole, UserSession};

/// JWT authentication middleware
pub async fn jwt_auth_middleware(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let session = auth_service.validate_session(token).await?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

fn session_of(request: &Request) -> Result<&UserSession, AuthError> {
    request
        .extensions()
        .get::<UserSession>()
        .ok_or(AuthError::MissingAuthHeader)
}

/// Platform back office
pub async fn super_admin_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    if session_of(&request)?.role != UserRole::SuperAdmin {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Tenant admins and trainers
pub async fn staff_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    let session = session_of(&request)?;
    if !session.role.is_staff() || session.tenant_id.is_none() {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Tenant admins only
pub async fn admin_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    let session = session_of(&request)?;
    if session.role != UserRole::Admin || session.tenant_id.is_none() {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Student accounts only
pub async fn student_only_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    let session = session_of(&request)?;
    if session.role != UserRole::Student || session.tenant_id.is_none() {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// CORS configuration. Tokens travel in the Authorization header, so no
/// credentialed requests are needed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn security_headers_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    )
}

/// Sliding window rate limiter (in-memory, per process)
#[derive(Debug, Clone)]
pub struct RateLimiter {
    requests: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
            trust_proxy_headers: false,
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Key clients on `x-forwarded-for` / `x-real-ip`. Only safe behind a
    /// proxy that overwrites those headers.
    pub fn trusting_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Address a request is counted against: the forwarded client when proxy
    /// headers are trusted, otherwise the socket peer.
    pub fn client_key(&self, request: &Request) -> Option<String> {
        if self.trust_proxy_headers {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .or_else(|| request.headers().get("x-real-ip"))
                .and_then(|header| header.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());
            if let Some(client) = forwarded {
                return Some(client.to_string());
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    }

    pub fn check_rate_limit(&self, key: &str) -> bool {
        let mut requests = self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        // Forget keys that have been idle for a full window
        requests.retain(|_, hits| hits.last().is_some_and(|last| now.duration_since(*last) < self.window));

        let entry = requests.entry(key.to_string()).or_default();
        entry.retain(|&time| now.duration_since(time) < self.window);

        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push(now);
        true
    }
}

/// Limits login attempts per client address
pub async fn login_rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Unidentified callers are not pooled into one shared bucket
    let Some(client_ip) = rate_limiter.client_key(&request) else {
        debug!("No client address for login request; rate limit skipped");
        return Ok(next.run(request).await);
    };

    if !rate_limiter.check_rate_limit(&client_ip) {
        warn!(client_ip = %client_ip, "Login rate limit exceeded");
        return Err(AuthError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.check_rate_limit("client1"));
        assert!(limiter.check_rate_limit("client1"));
        assert!(limiter.check_rate_limit("client1"));
        assert!(!limiter.check_rate_limit("client1"));

        assert!(limiter.check_rate_limit("client2"));
    }

    #[test]
    fn test_rate_limiter_window_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));

        assert!(limiter.check_rate_limit("client"));
        assert!(!limiter.check_rate_limit("client"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check_rate_limit("client"));
    }

    fn login_request(peer: Option<&str>, forwarded_for: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().method(Method::POST).uri("/api/auth/login");
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded_for);
        }
        let mut request = builder.body(axum::body::Body::empty()).unwrap();
        if let Some(peer) = peer {
            request
                .extensions_mut()
                .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        }
        request
    }

    #[test]
    fn test_client_key_ignores_forwarded_headers_by_default() {
        let limiter = RateLimiter::per_minute(5);

        let request = login_request(Some("203.0.113.7:51000"), Some("198.51.100.1"));
        assert_eq!(limiter.client_key(&request).as_deref(), Some("203.0.113.7"));

        let request = login_request(None, Some("198.51.100.1"));
        assert_eq!(limiter.client_key(&request), None);
    }

    #[test]
    fn test_client_key_uses_forwarded_headers_when_trusted() {
        let limiter = RateLimiter::per_minute(5).trusting_proxy_headers(true);

        let request = login_request(Some("10.0.0.2:443"), Some("198.51.100.1, 10.0.0.2"));
        assert_eq!(limiter.client_key(&request).as_deref(), Some("198.51.100.1"));

        let request = login_request(Some("10.0.0.2:443"), None);
        assert_eq!(limiter.client_key(&request).as_deref(), Some("10.0.0.2"));
    }
}
