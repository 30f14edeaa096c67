//! Login, authenticated requests with one re-authentication, and logout.

use std::sync::Arc;

use log::{debug, info, warn};

use super::{AuthState, Credentials, Session};
use crate::config::{Config, LoginFields, HEADER_COOKIE, HEADER_REFERER};
use crate::error_handling::{AuthFailure, ObsError, TransportError};
use crate::session::is_login_form;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// Drives a `Session` through login, expiry and logout over a `Transport`.
pub struct SessionManager<T> {
    transport: T,
    config: Arc<Config>,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T, config: Arc<Config>) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Logs in: fetches the login form, replays its hidden fields with the
    /// credentials and checks the configured success marker.
    ///
    /// On success the session is `Authenticated` and keeps the credentials
    /// for a later re-authentication.
    ///
    /// # Errors
    ///
    /// Returns an `AuthFailure`; the session is then `Anonymous`.
    pub async fn authenticate(
        &self,
        session: &mut Session,
        credentials: Credentials,
    ) -> Result<(), AuthFailure> {
        info!("Logging in as {}", credentials.username);
        match self.login_exchange(session, &credentials).await {
            Ok(()) => {
                info!("Login succeeded for {}", credentials.username);
                session.mark_authenticated(credentials);
                Ok(())
            }
            Err(failure) => {
                warn!("Login failed for {}: {}", credentials.username, failure);
                session.reset();
                Err(failure)
            }
        }
    }

    async fn login_exchange(
        &self,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), AuthFailure> {
        let login_path = self.config.login_path.as_str();
        let page = self.send(session, HttpRequest::get(login_path)).await?;
        if page.status >= 400 {
            return Err(AuthFailure::UnexpectedResponse {
                status: page.status,
            });
        }
        if !session
            .tokens()
            .is_some_and(|t| t.has_any(&self.config.token_fields))
        {
            return Err(AuthFailure::TokenMissing);
        }

        let tokens = session.take_tokens();
        let target = tokens
            .action()
            .and_then(|action| session.resolve(login_path, action))
            .unwrap_or_else(|| login_path.to_string());
        let fields = self.login_fields(credentials);
        let form = tokens.merge(fields.to_form(&credentials.username, credentials.password()));
        let referer = session
            .base_url()
            .join(login_path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| login_path.to_string());

        debug!("Posting login form to {} ({} fields)", target, form.len());
        let request = HttpRequest::post(target, form).with_header(HEADER_REFERER, referer);
        let response = self.send(session, request).await?;

        let location = response.location().and_then(|l| session.path_of(l));
        if self
            .config
            .success_marker
            .matches(response.status, &response.body, location.as_deref())
        {
            Ok(())
        } else if is_login_form(&response.body, &fields.password_field) {
            Err(AuthFailure::BadCredentials)
        } else {
            Err(AuthFailure::UnexpectedResponse {
                status: response.status,
            })
        }
    }

    /// Sends the request `build` makes from the session, re-authenticating once
    /// if the server reports the session expired.
    ///
    /// Cookies are attached; a POST consumes the stored form tokens.
    ///
    /// # Errors
    ///
    /// * `NotAuthenticated` - the session never logged in
    /// * `SessionExpired` - re-authentication failed, or the retry expired too
    /// * `Network` - the transport failed
    pub async fn with_authenticated_request<F>(
        &self,
        session: &mut Session,
        build: F,
    ) -> Result<HttpResponse, ObsError>
    where
        F: Fn(&Session) -> HttpRequest,
    {
        let reauthenticated = match session.state() {
            AuthState::Anonymous => return Err(ObsError::NotAuthenticated),
            AuthState::Expired => {
                self.reauthenticate(session).await?;
                true
            }
            AuthState::Authenticated => false,
        };

        let response = self.send_built(session, &build).await?;
        if !self.is_expired(session, &response) {
            return Ok(response);
        }
        if reauthenticated {
            warn!("Session expired right after re-authentication");
            session.mark_expired();
            return Err(ObsError::SessionExpired);
        }

        warn!("Session expired (HTTP {}), re-authenticating", response.status);
        session.mark_expired();
        self.reauthenticate(session).await?;

        let retry = self.send_built(session, &build).await?;
        if self.is_expired(session, &retry) {
            warn!("Session expired again right after re-authentication");
            session.mark_expired();
            return Err(ObsError::SessionExpired);
        }
        Ok(retry)
    }

    /// Ends the session on the server (best effort) and resets it locally.
    pub async fn logout(&self, session: &mut Session) {
        if session.state() != AuthState::Anonymous {
            let request = HttpRequest::get(self.config.logout_path.as_str());
            match self.send(session, request).await {
                Ok(response) => debug!("Logout answered HTTP {}", response.status),
                Err(e) => warn!("Logout request failed, resetting session anyway: {}", e),
            }
        }
        session.reset();
        info!("Logged out");
    }

    /// Whether a response means the server no longer sees us as logged in.
    pub fn is_expired(&self, session: &Session, response: &HttpResponse) -> bool {
        let login_path = session.path_of(&self.config.login_path);
        let redirected_to_login = response
            .location()
            .and_then(|location| session.path_of(location))
            .is_some_and(|path| Some(path) == login_path);
        if redirected_to_login {
            return true;
        }
        if is_login_form(&response.body, &self.password_field(session)) {
            return true;
        }
        match &self.config.authenticated_marker {
            Some(marker) => response.is_success() && !response.body.contains(marker.as_str()),
            None => false,
        }
    }

    async fn reauthenticate(&self, session: &mut Session) -> Result<(), ObsError> {
        let Some(credentials) = session.credentials().cloned() else {
            session.reset();
            return Err(ObsError::SessionExpired);
        };
        match self.authenticate(session, credentials).await {
            Ok(()) => Ok(()),
            Err(AuthFailure::Network(e)) => Err(ObsError::Network(e)),
            Err(_) => Err(ObsError::SessionExpired),
        }
    }

    async fn send_built<F>(&self, session: &mut Session, build: &F) -> Result<HttpResponse, ObsError>
    where
        F: Fn(&Session) -> HttpRequest,
    {
        let mut request = build(session);
        if request.method == Method::Post {
            let explicit = request.form.take().unwrap_or_default();
            request.form = Some(session.take_tokens().merge(explicit));
        }
        Ok(self.send(session, request).await?)
    }

    async fn send(
        &self,
        session: &mut Session,
        mut request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        if let Some(cookies) = session.cookie_header() {
            request = request.with_header(HEADER_COOKIE, cookies);
        }
        let response = self.transport.send(request).await?;
        session.absorb(&response);
        Ok(response)
    }

    fn login_fields<'a>(&'a self, credentials: &'a Credentials) -> &'a LoginFields {
        credentials.fields.as_ref().unwrap_or(&self.config.login_fields)
    }

    fn password_field(&self, session: &Session) -> String {
        session
            .credentials()
            .and_then(|c| c.fields.as_ref())
            .unwrap_or(&self.config.login_fields)
            .password_field
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuccessMarker;
    use crate::test_helpers::*;
    use url::Url;

    fn manager(responses: Vec<HttpResponse>) -> SessionManager<ScriptedTransport> {
        SessionManager::new(ScriptedTransport::new(responses), Arc::new(Config::default()))
    }

    fn session() -> Session {
        Session::new(Url::parse("http://localhost").unwrap())
    }

    fn form_value<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
        request
            .form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_login_replays_viewstate() {
        let mgr = manager(vec![login_page("vs-1"), login_redirect()]);
        let mut s = session();
        mgr.authenticate(&mut s, Credentials::new("20231234", "pw"))
            .await
            .expect("login");

        assert!(s.is_authenticated());
        assert_eq!(s.cookie(".ASPXAUTH"), Some("auth1"));
        let requests = mgr.transport().requests();
        assert_eq!(requests.len(), 2);
        let post = &requests[1];
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.path, "/Default.aspx");
        assert_eq!(form_value(post, "__VIEWSTATE"), Some("vs-1"));
        assert_eq!(form_value(post, "textKulID"), Some("20231234"));
        assert_eq!(form_value(post, "__EVENTTARGET"), Some("buttonTamam"));
        assert!(post
            .headers
            .iter()
            .any(|(k, v)| k == HEADER_COOKIE && v.contains("ASP.NET_SessionId=s1")));
    }

    #[tokio::test]
    async fn test_login_without_token_fails_before_posting() {
        let mgr = manager(vec![ok_page("<form><input name='textSifre' type='password'></form>")]);
        let mut s = session();
        let err = mgr
            .authenticate(&mut s, Credentials::new("u", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthFailure::TokenMissing));
        assert_eq!(mgr.transport().requests().len(), 1);
        assert_eq!(s.state(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_form_again_means_bad_credentials() {
        let mgr = manager(vec![login_page("vs-1"), login_page("vs-2")]);
        let mut s = session();
        let err = mgr
            .authenticate(&mut s, Credentials::new("u", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthFailure::BadCredentials));
        assert_eq!(s.state(), AuthState::Anonymous);
        assert!(s.cookie_header().is_none());
    }

    #[tokio::test]
    async fn test_unexpected_login_response() {
        let mgr = manager(vec![login_page("vs-1"), HttpResponse::new(500, "Server Error")]);
        let err = mgr
            .authenticate(&mut session(), Credentials::new("u", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthFailure::UnexpectedResponse { status: 500 }));
    }

    #[tokio::test]
    async fn test_network_failure_during_login() {
        let mgr = SessionManager::new(
            ScriptedTransport::new(vec![]).then_fail(),
            Arc::new(Config::default()),
        );
        let err = mgr
            .authenticate(&mut session(), Credentials::new("u", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthFailure::Network(_)));
    }

    #[tokio::test]
    async fn test_text_success_marker() {
        let config = Config {
            success_marker: SuccessMarker::Text("Hoşgeldiniz".to_string()),
            ..Default::default()
        };
        let mgr = SessionManager::new(
            ScriptedTransport::new(vec![login_page("vs"), ok_page("<h1>Hoşgeldiniz</h1>")]),
            Arc::new(config),
        );
        let mut s = session();
        mgr.authenticate(&mut s, Credentials::new("u", "p")).await.unwrap();
        assert!(s.is_authenticated());
    }

    #[tokio::test]
    async fn test_request_requires_login() {
        let mgr = manager(vec![]);
        let err = mgr
            .with_authenticated_request(&mut session(), |_| HttpRequest::get("/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ObsError::NotAuthenticated));
        assert!(mgr.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_expiry_triggers_one_reauth_and_retry() {
        let mgr = manager(vec![
            login_page("vs-1"),
            login_redirect(),
            expired_redirect(),
            login_page("vs-2"),
            login_redirect(),
            ok_page("<p>profile</p>"),
        ]);
        let mut s = session();
        mgr.authenticate(&mut s, Credentials::new("u", "p")).await.unwrap();

        let response = mgr
            .with_authenticated_request(&mut s, |_| HttpRequest::get("/Birimler/Ogrenci/Bilgilerim.aspx"))
            .await
            .expect("retried request");
        assert_eq!(response.body, "<p>profile</p>");
        assert!(s.is_authenticated());

        let requests = mgr.transport().requests();
        assert_eq!(requests.len(), 6);
        assert_eq!(form_value(&requests[4], "__VIEWSTATE"), Some("vs-2"));
        assert_eq!(requests[5].path, "/Birimler/Ogrenci/Bilgilerim.aspx");
    }

    #[tokio::test]
    async fn test_second_expiry_surfaces_session_expired() {
        let mgr = manager(vec![
            login_page("vs-1"),
            login_redirect(),
            expired_redirect(),
            login_page("vs-2"),
            login_redirect(),
            expired_redirect(),
        ]);
        let mut s = session();
        mgr.authenticate(&mut s, Credentials::new("u", "p")).await.unwrap();
        let err = mgr
            .with_authenticated_request(&mut s, |_| HttpRequest::get("/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ObsError::SessionExpired));
        assert_eq!(s.state(), AuthState::Expired);
        assert_eq!(mgr.transport().remaining(), 0);
    }

    #[tokio::test]
    async fn test_expired_session_reauthenticates_once_on_next_request() {
        let mgr = manager(vec![
            login_page("vs-1"),
            login_redirect(),
            expired_redirect(),
            login_page("vs-2"),
            login_redirect(),
            expired_redirect(),
            // next request: renewed on entry, then expired again
            login_page("vs-3"),
            login_redirect(),
            expired_redirect(),
            login_page("vs-4"),
            login_redirect(),
        ]);
        let mut s = session();
        mgr.authenticate(&mut s, Credentials::new("u", "p")).await.unwrap();
        let first = mgr
            .with_authenticated_request(&mut s, |_| HttpRequest::get("/x"))
            .await
            .unwrap_err();
        assert!(matches!(first, ObsError::SessionExpired));
        assert_eq!(s.state(), AuthState::Expired);

        let second = mgr
            .with_authenticated_request(&mut s, |_| HttpRequest::get("/x"))
            .await
            .unwrap_err();
        assert!(matches!(second, ObsError::SessionExpired));
        assert_eq!(s.state(), AuthState::Expired);

        let requests = mgr.transport().requests();
        assert_eq!(requests.len(), 9);
        let logins = requests[6..].iter().filter(|r| r.method == Method::Post).count();
        assert_eq!(logins, 1);
        assert_eq!(mgr.transport().remaining(), 2);
    }

    #[tokio::test]
    async fn test_failed_reauth_resets_to_anonymous() {
        let mgr = manager(vec![
            login_page("vs-1"),
            login_redirect(),
            ok_page(&LOGIN_PAGE.replace("VIEWSTATE_VALUE", "vs-2")),
            login_page("vs-3"),
            login_page("vs-4"),
        ]);
        let mut s = session();
        mgr.authenticate(&mut s, Credentials::new("u", "p")).await.unwrap();
        let err = mgr
            .with_authenticated_request(&mut s, |_| HttpRequest::get("/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ObsError::SessionExpired));
        assert_eq!(s.state(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_authenticated_marker_missing_means_expired() {
        let config = Config {
            authenticated_marker: Some("Çıkış".to_string()),
            ..Default::default()
        };
        let mgr = SessionManager::new(ScriptedTransport::new(vec![]), Arc::new(config));
        let s = session();
        assert!(mgr.is_expired(&s, &ok_page("<p>Anasayfa</p>")));
        assert!(!mgr.is_expired(&s, &ok_page("<a>Çıkış</a>")));
        assert!(!mgr.is_expired(&s, &HttpResponse::new(404, "")));
    }

    #[tokio::test]
    async fn test_post_consumes_page_tokens() {
        let mgr = manager(vec![
            login_page("vs-1"),
            login_redirect(),
            ok_page("<form><input type='hidden' name='__VIEWSTATE' value='page-vs'></form>"),
            ok_page("<p>saved</p>"),
            ok_page("<p>saved again</p>"),
        ]);
        let mut s = session();
        mgr.authenticate(&mut s, Credentials::new("u", "p")).await.unwrap();
        mgr.with_authenticated_request(&mut s, |_| HttpRequest::get("/form"))
            .await
            .unwrap();

        let post = |_: &Session| HttpRequest::post("/form", vec![("a".to_string(), "1".to_string())]);
        mgr.with_authenticated_request(&mut s, post).await.unwrap();
        mgr.with_authenticated_request(&mut s, post).await.unwrap();

        let requests = mgr.transport().requests();
        assert_eq!(form_value(&requests[3], "__VIEWSTATE"), Some("page-vs"));
        assert_eq!(form_value(&requests[3], "a"), Some("1"));
        assert_eq!(form_value(&requests[4], "__VIEWSTATE"), None);
    }

    #[tokio::test]
    async fn test_logout_resets_even_when_network_fails() {
        let mgr = SessionManager::new(
            ScriptedTransport::new(vec![login_page("vs"), login_redirect()]).then_fail(),
            Arc::new(Config::default()),
        );
        let mut s = session();
        mgr.authenticate(&mut s, Credentials::new("u", "p")).await.unwrap();
        mgr.logout(&mut s).await;
        assert_eq!(s.state(), AuthState::Anonymous);
        assert!(s.cookie_header().is_none());
        assert_eq!(mgr.transport().requests()[2].path, "/Birimler/Ogrenci/Cikis.aspx");
    }
}
