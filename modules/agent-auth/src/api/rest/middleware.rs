use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use cookie::{Cookie, CookieJar};
use fleet_security::{AgentToken, RequestContext};
use http::header::COOKIE;
use http::request::Parts;
use http::{Extensions, HeaderMap};
use secrecy::{ExposeSecret, SecretString};

use crate::api::rest::error::agent_auth_error_to_response;
use crate::api::rest::state::{AgentAuthState, TokenSource};
use crate::domain::error::AgentAuthError;
use crate::domain::subject::AuthenticatedAgent;

/// Authenticates a workspace agent by its session token.
///
/// On success the request carries the agent's
/// [`WorkspaceAgent`](fleet_store::models::WorkspaceAgent) record and a
/// [`RequestContext`] acting as the agent's workspace-scoped subject.
/// A context already present on the request donates its cancellation token
/// and deadline.
pub async fn agent_auth_middleware(
    State(state): State<AgentAuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(raw) = extract_session_token(req.headers(), &state.tokens) else {
        return agent_auth_error_to_response(&AgentAuthError::MissingToken {
            cookie: state.tokens.cookie.clone(),
        });
    };
    let token = match AgentToken::parse(raw.expose_secret()) {
        Ok(token) => token,
        Err(e) => {
            return agent_auth_error_to_response(&AgentAuthError::InvalidToken { len: e.len });
        }
    };

    let base = base_context(req.extensions());
    match state.resolver.authenticate(&base, token).await {
        Ok(AuthenticatedAgent { agent, subject }) => {
            req.extensions_mut().insert(base.with_subject(subject));
            req.extensions_mut().insert(agent);
            next.run(req).await
        }
        Err(err) => agent_auth_error_to_response(&err),
    }
}

/// The [`RequestContext`] an outer layer attached to the request, carrying
/// its deadline and cancellation. Requests without one get a fresh context.
#[derive(Debug, Clone)]
pub struct BaseContext(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for BaseContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(base_context(&parts.extensions)))
    }
}

fn base_context(extensions: &Extensions) -> RequestContext {
    extensions
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default()
}

/// All cookies on the request. Unparsable chunks are skipped.
fn parse_cookies(headers: &HeaderMap) -> CookieJar {
    let mut jar = CookieJar::new();
    for raw in headers.get_all(COOKIE).iter().filter_map(|v| v.to_str().ok()) {
        for chunk in raw.split(';').map(str::trim) {
            if let Ok(cookie) = Cookie::parse(chunk) {
                jar.add_original(cookie.into_owned());
            }
        }
    }
    jar
}

/// The session token from the configured cookie, else the configured header.
fn extract_session_token(headers: &HeaderMap, source: &TokenSource) -> Option<SecretString> {
    let jar = parse_cookies(headers);
    let from_cookie = jar
        .get(&source.cookie)
        .map(|c| c.value_trimmed().trim().to_owned())
        .filter(|v| !v.is_empty());
    let from_header = || {
        headers
            .get(&source.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };
    from_cookie.or_else(from_header).map(SecretString::from)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Instant;

    use fleet_security::ContextError;
    use http::{HeaderName, HeaderValue};

    use super::*;

    fn source() -> TokenSource {
        TokenSource {
            cookie: "fleet_session_token".to_owned(),
            header: HeaderName::from_static("fleet-session-token"),
        }
    }

    fn extract(headers: &HeaderMap) -> Option<String> {
        extract_session_token(headers, &source()).map(|s| s.expose_secret().to_owned())
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; fleet_session_token=abc; lang=en"),
        );
        assert_eq!(extract(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn header_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.insert("fleet-session-token", HeaderValue::from_static(" xyz "));
        assert_eq!(extract(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn cookie_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("fleet_session_token=from-cookie"));
        headers.insert("fleet-session-token", HeaderValue::from_static("from-header"));
        assert_eq!(extract(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn quoted_and_repeated_cookie_headers_are_parsed() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            COOKIE,
            HeaderValue::from_static("lang=en;fleet_session_token=\"abc\""),
        );
        assert_eq!(extract(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn empty_cookie_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("fleet_session_token="));
        headers.insert("fleet-session-token", HeaderValue::from_static("xyz"));
        assert_eq!(extract(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("fleet_session_token="));
        assert_eq!(extract(&headers), None);
    }

    async fn extract_base(req: http::Request<()>) -> RequestContext {
        let (mut parts, ()) = req.into_parts();
        let Ok(BaseContext(ctx)) = BaseContext::from_request_parts(&mut parts, &()).await;
        ctx
    }

    #[tokio::test]
    async fn base_context_keeps_the_outer_deadline() {
        let outer = RequestContext::new().deadline(Instant::now());
        let mut req = http::Request::new(());
        req.extensions_mut().insert(outer);
        let ctx = extract_base(req).await;
        assert_eq!(ctx.ensure_live(), Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn base_context_defaults_without_a_layer() {
        let ctx = extract_base(http::Request::new(())).await;
        assert!(ctx.ensure_live().is_ok());
    }
}
