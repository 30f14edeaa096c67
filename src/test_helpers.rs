//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use crate::error_handling::TransportError;
use crate::transport::{HttpRequest, HttpResponse, Transport};

pub const LOGIN_PAGE: &str = include_str!("../tests/fixtures/login.html");
pub const PROFILE_PAGE: &str = include_str!("../tests/fixtures/profile.html");
pub const TRANSCRIPT_PAGE: &str = include_str!("../tests/fixtures/transcript.html");
pub const COURSES_PAGE: &str = include_str!("../tests/fixtures/courses.html");
pub const FEES_PAGE: &str = include_str!("../tests/fixtures/fees.html");
pub const ATTENDANCE_PAGE: &str = include_str!("../tests/fixtures/attendance.html");
pub const SCHEDULE_PAGE: &str = include_str!("../tests/fixtures/schedule.html");
pub const MESSAGES_PAGE: &str = include_str!("../tests/fixtures/messages.html");
pub const HOME_PAGE: &str = include_str!("../tests/fixtures/home.html");

/// Transport answering from a script and recording what it was sent.
///
/// When the script runs out it answers with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then_fail(self) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError::InvalidUrl("scripted failure".to_string())));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        self.requests.lock().unwrap().push(request);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::InvalidUrl("script exhausted".to_string())));
        async move { next }
    }
}

/// Login form served with the given view state.
pub fn login_page(viewstate: &str) -> HttpResponse {
    HttpResponse::new(200, LOGIN_PAGE.replace("VIEWSTATE_VALUE", viewstate))
        .with_header("Set-Cookie", "ASP.NET_SessionId=s1; path=/; HttpOnly")
}

/// Successful login postback: redirect into the student area with an auth cookie.
pub fn login_redirect() -> HttpResponse {
    HttpResponse::new(302, "")
        .with_header("Location", "/Birimler/Ogrenci/")
        .with_header("Set-Cookie", ".ASPXAUTH=auth1; path=/; HttpOnly")
}

/// Expiry as the records system reports it: redirect back to the login page.
pub fn expired_redirect() -> HttpResponse {
    HttpResponse::new(302, "").with_header("Location", "/?ReturnUrl=%2fBirimler%2fOgrenci%2f")
}

pub fn ok_page(body: &str) -> HttpResponse {
    HttpResponse::new(200, body)
}
