//! Page retrieval through an authenticated session.
//!
//! Each fetch goes to the network; nothing is cached, since the records
//! system's pages change with every registration or payment.

use log::debug;

use crate::config::MAX_HTML_PREVIEW_CHARS;
use crate::error_handling::ObsError;
use crate::extract::normalize::truncate_chars;
use crate::session::{Session, SessionManager};
use crate::transport::{HttpRequest, Transport};

/// Status not found; the next candidate path is tried.
const STATUS_NOT_FOUND: u16 = 404;

/// A fetched page, as served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub status: u16,
    pub raw_html: String,
    /// Path the page was fetched from
    pub path: String,
}

/// Fetches pages through a `SessionManager`, which handles expiry.
pub struct PageFetcher<T> {
    manager: SessionManager<T>,
}

impl<T: Transport> PageFetcher<T> {
    pub fn new(manager: SessionManager<T>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &SessionManager<T> {
        &self.manager
    }

    /// Fetches one page.
    ///
    /// # Errors
    ///
    /// * `NeedsReauth` - the server answered with a non-2xx status
    /// * `SessionExpired`, `NotAuthenticated`, `Network` - from the session layer
    pub async fn fetch(&self, session: &mut Session, path: &str) -> Result<PageResult, ObsError> {
        debug!("Fetching {}", path);
        let response = self
            .manager
            .with_authenticated_request(session, |_| HttpRequest::get(path))
            .await?;

        if !response.is_success() {
            debug!("{} answered HTTP {}", path, response.status);
            return Err(ObsError::NeedsReauth {
                status: response.status,
            });
        }

        debug!(
            "Fetched {} ({} bytes): {}",
            path,
            response.body.len(),
            truncate_chars(&response.body, MAX_HTML_PREVIEW_CHARS)
        );
        Ok(PageResult {
            status: response.status,
            raw_html: response.body,
            path: path.to_string(),
        })
    }

    /// Fetches the first of `candidates` that exists.
    ///
    /// A 404 moves on to the next path; any other error is returned at once.
    pub async fn fetch_first(
        &self,
        session: &mut Session,
        candidates: &[String],
    ) -> Result<PageResult, ObsError> {
        for path in candidates {
            match self.fetch(session, path).await {
                Err(ObsError::NeedsReauth {
                    status: STATUS_NOT_FOUND,
                }) => debug!("{} not found, trying next candidate", path),
                other => return other,
            }
        }
        Err(ObsError::NeedsReauth {
            status: STATUS_NOT_FOUND,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::session::Credentials;
    use crate::test_helpers::*;
    use crate::transport::HttpResponse;
    use url::Url;

    async fn logged_in(responses: Vec<HttpResponse>) -> (PageFetcher<ScriptedTransport>, Session) {
        let mut script = vec![login_page("vs"), login_redirect()];
        script.extend(responses);
        let manager = SessionManager::new(ScriptedTransport::new(script), Arc::new(Config::default()));
        let mut session = Session::new(Url::parse("http://localhost").unwrap());
        manager
            .authenticate(&mut session, Credentials::new("u", "p"))
            .await
            .unwrap();
        (PageFetcher::new(manager), session)
    }

    #[tokio::test]
    async fn test_fetch_returns_raw_html() {
        let (fetcher, mut session) = logged_in(vec![ok_page("<p>ok</p>")]).await;
        let page = fetcher.fetch(&mut session, "/a.aspx").await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.raw_html, "<p>ok</p>");
        assert_eq!(page.path, "/a.aspx");
    }

    #[tokio::test]
    async fn test_error_status_needs_reauth() {
        let (fetcher, mut session) = logged_in(vec![HttpResponse::new(500, "boom")]).await;
        let err = fetcher.fetch(&mut session, "/a.aspx").await.unwrap_err();
        assert!(matches!(err, ObsError::NeedsReauth { status: 500 }));
    }

    #[tokio::test]
    async fn test_fetch_first_skips_missing_pages() {
        let (fetcher, mut session) = logged_in(vec![
            HttpResponse::new(404, "not here"),
            ok_page("<p>second</p>"),
        ])
        .await;
        let candidates = vec!["/a.aspx".to_string(), "/b.aspx".to_string(), "/c.aspx".to_string()];
        let page = fetcher.fetch_first(&mut session, &candidates).await.unwrap();
        assert_eq!(page.path, "/b.aspx");
        assert_eq!(fetcher.manager().transport().requests().len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_first_stops_on_other_errors() {
        let (fetcher, mut session) = logged_in(vec![HttpResponse::new(403, "")]).await;
        let candidates = vec!["/a.aspx".to_string(), "/b.aspx".to_string()];
        let err = fetcher.fetch_first(&mut session, &candidates).await.unwrap_err();
        assert!(matches!(err, ObsError::NeedsReauth { status: 403 }));
        assert_eq!(fetcher.manager().transport().remaining(), 0);
    }

    #[tokio::test]
    async fn test_fetch_first_all_missing() {
        let (fetcher, mut session) =
            logged_in(vec![HttpResponse::new(404, ""), HttpResponse::new(404, "")]).await;
        let candidates = vec!["/a.aspx".to_string(), "/b.aspx".to_string()];
        let err = fetcher.fetch_first(&mut session, &candidates).await.unwrap_err();
        assert!(matches!(err, ObsError::NeedsReauth { status: 404 }));
    }
}
