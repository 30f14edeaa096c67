//! Configuration constants.
//!
//! Defaults for the login form, the page layout of the student information
//! system and the analytics thresholds. Every value here is only a default:
//! `Config` and `AnalyticsConfig` carry the values actually used.

/// Per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default User-Agent string for HTTP requests.
///
/// Some deployments of the records system refuse requests without a browser-like
/// User-Agent. Users can override this via the `--user-agent` CLI flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Login form
pub const DEFAULT_LOGIN_PATH: &str = "/";
pub const DEFAULT_LOGOUT_PATH: &str = "/Birimler/Ogrenci/Cikis.aspx";
pub const DEFAULT_USERNAME_FIELD: &str = "textKulID";
pub const DEFAULT_PASSWORD_FIELD: &str = "textSifre";
/// Submit button name; WebForms also expects it as `__EVENTTARGET`
pub const DEFAULT_SUBMIT_BUTTON: &str = "buttonTamam";
pub const DEFAULT_SUBMIT_VALUE: &str = "Giriş";
/// Where a successful login redirects to
pub const DEFAULT_SUCCESS_REDIRECT: &str = "/Birimler/Ogrenci/";

/// Hidden form fields that carry anti-forgery or view-state tokens.
///
/// A login page without at least one of these (with a value) is reported as
/// `TokenMissing`. Other hidden inputs are still captured and replayed.
pub const ANTI_FORGERY_FIELDS: &[&str] = &[
    "__VIEWSTATE",
    "__VIEWSTATEGENERATOR",
    "__EVENTVALIDATION",
    "__RequestVerificationToken",
    "csrfmiddlewaretoken",
    "__csrf",
    "_csrf",
    "csrf_token",
    "CSRFToken",
    "authenticity_token",
];

// Extraction limits
/// Maximum raw row text kept in an extraction warning (characters)
pub const MAX_WARNING_RAW_CHARS: usize = 200;
/// Maximum HTML preview length in characters for debug logging
pub const MAX_HTML_PREVIEW_CHARS: usize = 500;

// Analytics defaults
/// GPA below this triggers an academic warning
pub const DEFAULT_LOW_GPA_THRESHOLD: f64 = 2.0;
/// Absence ratio at which a medium-priority reminder is raised
pub const DEFAULT_ABSENCE_WARNING_RATIO: f64 = 0.2;
/// Absence ratio at which the course is at risk of failing on attendance
pub const DEFAULT_ABSENCE_LIMIT_RATIO: f64 = 0.3;
/// Credits a student can realistically take in one term
pub const DEFAULT_CREDITS_PER_TERM_CAP: f64 = 30.0;
/// Credits required for graduation (four-year ECTS programme)
pub const DEFAULT_TOTAL_REQUIRED_CREDITS: f64 = 240.0;
/// A grade point strictly above this counts as passed (FD = 0.5 fails, DD = 1.0 passes)
pub const DEFAULT_PASS_GRADE_POINT: f64 = 0.5;
/// Highest grade point on the 4.0 scale
pub const DEFAULT_TOP_GRADE_POINT: f64 = 4.0;
/// Term-over-term GPA change below this magnitude is "stable"
pub const DEFAULT_TREND_THRESHOLD: f64 = 0.05;
