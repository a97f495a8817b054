use axum::http::{header, HeaderMap};
use chrono::Duration;
use std::sync::Arc;
use tally_core::models::SessionUser;
use tally_core::AppError;
use tally_db::SessionStore;

/// Name of the HTTP-only cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session_id";

/// Find the session token in the `Cookie` headers, if any.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .map(|token| token.trim_matches('"').to_string())
        .filter(|token| !token.is_empty())
}

/// Validates session tokens against the session store.
///
/// A session is live while it has been used within the inactivity window.
/// Each successful lookup slides the window forward.
#[derive(Clone)]
pub struct SessionAuthenticator {
    sessions: Arc<dyn SessionStore>,
    inactivity: Duration,
}

impl SessionAuthenticator {
    pub fn new(sessions: Arc<dyn SessionStore>, inactivity: Duration) -> Self {
        Self {
            sessions,
            inactivity,
        }
    }

    pub async fn authenticate(&self, token: &str) -> Result<SessionUser, AppError> {
        self.sessions
            .touch_active_session(token, self.inactivity)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use tally_db::mock::InMemoryStore;

    #[test]
    fn test_token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=abc123; lang=ja"),
        );
        assert_eq!(session_token_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_missing_or_empty_cookie_yields_none() {
        let mut headers = HeaderMap::new();
        assert!(session_token_from_headers(&headers).is_none());
        headers.insert(header::COOKIE, HeaderValue::from_static("session_id="));
        assert!(session_token_from_headers(&headers).is_none());
        headers.insert(header::COOKIE, HeaderValue::from_static("other_session_id=x"));
        assert!(session_token_from_headers(&headers).is_none());
    }

    #[tokio::test]
    async fn test_live_session_resolves_same_user_repeatedly() {
        let store = InMemoryStore::new();
        store.add_user(7, "Aki");
        store.add_session("tok", 7, Utc::now() - Duration::days(29));
        let auth = SessionAuthenticator::new(Arc::new(store.clone()), Duration::days(30));

        let first = auth.authenticate("tok").await.unwrap();
        let second = auth.authenticate("tok").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.id, 7);
        // The lookup slid the window forward.
        let last_used = store.session_last_used("tok").unwrap();
        assert!(Utc::now() - last_used < Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_expired_or_unknown_session_is_unauthorized() {
        let store = InMemoryStore::new();
        store.add_user(7, "Aki");
        store.add_session("old", 7, Utc::now() - Duration::days(31));
        let auth = SessionAuthenticator::new(Arc::new(store), Duration::days(30));

        assert!(matches!(
            auth.authenticate("old").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.authenticate("nope").await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
