//! Configuration types.
//!
//! This module defines the structs and enums consumed by the client. None of
//! them are loaded from disk by the library; callers (or the CLI) build them.

use std::collections::BTreeMap;

use clap::ValueEnum;

use crate::config::constants::*;
use crate::pages::PageKind;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// How a login response is recognised as successful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessMarker {
    /// The response body contains this fragment
    Text(String),
    /// The response is a redirect whose target path starts with this prefix
    RedirectTo(String),
}

impl SuccessMarker {
    /// Checks a login response against the marker.
    ///
    /// `location_path` is the path of the `Location` header of a 3xx response,
    /// already resolved against the base URL.
    pub fn matches(&self, status: u16, body: &str, location_path: Option<&str>) -> bool {
        match self {
            SuccessMarker::Text(fragment) => (200..400).contains(&status) && body.contains(fragment),
            SuccessMarker::RedirectTo(prefix) => {
                (300..400).contains(&status)
                    && location_path.is_some_and(|path| path.starts_with(prefix.as_str()))
            }
        }
    }
}

/// Names of the login form fields.
///
/// The defaults match the WebForms login page of the records system; a
/// deployment with different control names overrides them through
/// `Credentials::with_fields` or `Config::login_fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFields {
    pub username_field: String,
    pub password_field: String,
    /// Submit button control name, posted with `submit_value`
    pub submit_name: Option<String>,
    pub submit_value: String,
    /// Value for `__EVENTTARGET` (WebForms postback source)
    pub event_target: Option<String>,
    /// Additional fields posted verbatim
    pub extra: Vec<(String, String)>,
}

impl Default for LoginFields {
    fn default() -> Self {
        Self {
            username_field: DEFAULT_USERNAME_FIELD.to_string(),
            password_field: DEFAULT_PASSWORD_FIELD.to_string(),
            submit_name: Some(DEFAULT_SUBMIT_BUTTON.to_string()),
            submit_value: DEFAULT_SUBMIT_VALUE.to_string(),
            event_target: Some(DEFAULT_SUBMIT_BUTTON.to_string()),
            extra: Vec::new(),
        }
    }
}

impl LoginFields {
    /// Builds the form fields for a login postback (tokens not included).
    pub fn to_form(&self, username: &str, password: &str) -> Vec<(String, String)> {
        let mut form = vec![
            (self.username_field.clone(), username.to_string()),
            (self.password_field.clone(), password.to_string()),
        ];
        if let Some(target) = &self.event_target {
            form.push(("__EVENTTARGET".to_string(), target.clone()));
            form.push(("__EVENTARGUMENT".to_string(), String::new()));
            form.push(("__LASTFOCUS".to_string(), String::new()));
        }
        if let Some(name) = &self.submit_name {
            form.push((name.clone(), self.submit_value.clone()));
        }
        form.extend(self.extra.iter().cloned());
        form
    }
}

/// Thresholds used by the analytics engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    /// GPA strictly below this raises an academic warning
    pub low_gpa_threshold: f64,
    /// Absence ratio raising a reminder
    pub absence_warning_ratio: f64,
    /// Absence ratio at which attendance fails the course
    pub absence_limit_ratio: f64,
    /// Maximum credits per term used for projections
    pub credits_per_term_cap: f64,
    /// Credits needed to graduate
    pub total_required_credits: f64,
    /// Grade points strictly above this count as passed
    pub pass_grade_point: f64,
    /// Top of the grade-point scale
    pub top_grade_point: f64,
    /// Minimum term-over-term change classified as improving/declining
    pub trend_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            low_gpa_threshold: DEFAULT_LOW_GPA_THRESHOLD,
            absence_warning_ratio: DEFAULT_ABSENCE_WARNING_RATIO,
            absence_limit_ratio: DEFAULT_ABSENCE_LIMIT_RATIO,
            credits_per_term_cap: DEFAULT_CREDITS_PER_TERM_CAP,
            total_required_credits: DEFAULT_TOTAL_REQUIRED_CREDITS,
            pass_grade_point: DEFAULT_PASS_GRADE_POINT,
            top_grade_point: DEFAULT_TOP_GRADE_POINT,
            trend_threshold: DEFAULT_TREND_THRESHOLD,
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use obs_client::Config;
///
/// let config = Config {
///     base_url: "https://obs.example.edu.tr".to_string(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the records system
    pub base_url: String,

    /// Path of the login page (GET for tokens, POST target if the form has no action)
    pub login_path: String,

    /// Path requested on logout
    pub logout_path: String,

    /// Default login form field names
    pub login_fields: LoginFields,

    /// How a successful login response is recognised
    pub success_marker: SuccessMarker,

    /// Text every authenticated page contains; its absence means the session expired
    pub authenticated_marker: Option<String>,

    /// Hidden fields recognised as anti-forgery tokens
    pub token_fields: Vec<String>,

    /// Per-page path overrides, tried before the built-in candidates
    pub page_paths: BTreeMap<PageKind, String>,

    /// Maximum announcements returned per page (None = all)
    pub announcement_limit: Option<usize>,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Analytics thresholds
    pub analytics: AnalyticsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            login_fields: LoginFields::default(),
            success_marker: SuccessMarker::RedirectTo(DEFAULT_SUCCESS_REDIRECT.to_string()),
            authenticated_marker: None,
            token_fields: ANTI_FORGERY_FIELDS.iter().map(|s| s.to_string()).collect(),
            page_paths: BTreeMap::new(),
            announcement_limit: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl Config {
    /// Paths to try for a page, override first, without duplicates.
    pub fn page_candidates(&self, page: PageKind) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        if let Some(path) = self.page_paths.get(&page) {
            paths.push(path.clone());
        }
        for path in page.default_paths() {
            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }
        paths
    }
}
