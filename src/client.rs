//! High-level client: one method per operation of the records system.

use std::sync::Arc;

use chrono::NaiveDate;
use log::{info, warn};
use url::Url;

use crate::analytics::{
    compute_course_advisory, compute_credit_projection, compute_gpa_trend, compute_notifications, CourseAdvisory,
    CreditProjection, GpaTrend, Notification,
};
use crate::config::Config;
use crate::error_handling::{InitializationError, ObsError, StructureReason};
use crate::extract::{ExtractionResult, ExtractorRegistry, PageRecords};
use crate::fetch::PageFetcher;
use crate::models::{AttendanceRecord, CourseEntry, FeeRecord, Profile, TranscriptEntry};
use crate::pages::PageKind;
use crate::session::{Credentials, Session, SessionManager};
use crate::transport::{ReqwestTransport, Transport};

/// Client for one student account.
///
/// Owns a single `Session`; every operation takes `&mut self`, so requests
/// on one client are strictly sequential. Use one client per account for
/// concurrent work.
///
/// # Examples
///
/// ```no_run
/// use obs_client::{Config, Credentials, ObsClient, PageKind};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config {
///     base_url: "https://obs.example.edu.tr".to_string(),
///     ..Default::default()
/// };
/// let mut client = ObsClient::new(config)?;
/// client.login(Credentials::new("2012345678", "secret")).await?;
/// let transcript = client.fetch_page(PageKind::Transcript).await?;
/// println!("{} entries, partial: {}", transcript.records.len(), transcript.is_partial());
/// client.logout().await;
/// # Ok(())
/// # }
/// ```
pub struct ObsClient<T = ReqwestTransport> {
    fetcher: PageFetcher<T>,
    registry: ExtractorRegistry,
    session: Session,
}

impl ObsClient<ReqwestTransport> {
    /// Creates a client talking HTTP to `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an `InitializationError` if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, InitializationError> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ObsClient<T> {
    /// Creates a client over any transport.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::InvalidBaseUrl` if the base URL does not parse.
    pub fn with_transport(config: Config, transport: T) -> Result<Self, InitializationError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| InitializationError::InvalidBaseUrl(config.base_url.clone()))?;
        let registry = ExtractorRegistry::default().with_link_limit(config.announcement_limit);
        let manager = SessionManager::new(transport, Arc::new(config));
        Ok(Self {
            fetcher: PageFetcher::new(manager),
            registry,
            session: Session::new(base_url),
        })
    }

    /// Replaces the extraction rules, e.g. for a deployment with a different layout.
    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &Config {
        self.fetcher.manager().config()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        self.fetcher.manager().transport()
    }

    /// Logs in with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns `ObsError::AuthFailed` with the reason; the session is then anonymous.
    pub async fn login(&mut self, credentials: Credentials) -> Result<(), ObsError> {
        self.fetcher
            .manager()
            .authenticate(&mut self.session, credentials)
            .await?;
        Ok(())
    }

    /// Fetches a page and extracts its records.
    ///
    /// Script-rendered pages fail with `StructureNotFound` before any request
    /// is made. Candidate paths are tried in order, skipping those that 404.
    ///
    /// # Errors
    ///
    /// * `NotAuthenticated` - `login` has not succeeded
    /// * `SessionExpired` - the session expired and re-authentication did not help
    /// * `NeedsReauth` - the server answered with an error status
    /// * `StructureNotFound` - the page's layout is not recognised
    /// * `Network` - the transport failed
    pub async fn fetch_page(&mut self, page: PageKind) -> Result<ExtractionResult, ObsError> {
        if self.registry.is_script_rendered(page) {
            return Err(ObsError::StructureNotFound {
                page,
                reason: StructureReason::ScriptRendered,
            });
        }
        let candidates = self.config().page_candidates(page);
        let fetched = self.fetcher.fetch_first(&mut self.session, &candidates).await?;
        let result = self.registry.extract(page, &fetched.raw_html)?;
        info!(
            "Fetched {} from {}: {} records, {} warnings",
            page,
            fetched.path,
            result.records.len(),
            result.warnings.len()
        );
        Ok(result)
    }

    /// Ends the session on the server (best effort) and locally.
    pub async fn logout(&mut self) {
        self.fetcher.manager().logout(&mut self.session).await;
    }

    /// GPA per term and the latest trend, from the transcript.
    pub async fn gpa_trend(&mut self) -> Result<GpaTrend, ObsError> {
        let transcript = self.transcript().await?;
        Ok(compute_gpa_trend(&transcript, &self.config().analytics))
    }

    /// Progress towards the configured credit requirement, from the transcript.
    pub async fn credit_projection(&mut self) -> Result<CreditProjection, ObsError> {
        let transcript = self.transcript().await?;
        let analytics = &self.config().analytics;
        Ok(compute_credit_projection(
            &transcript,
            analytics.total_required_credits,
            analytics.credits_per_term_cap,
            analytics.pass_grade_point,
        ))
    }

    /// Eligibility and schedule conflicts of `candidates` against the
    /// transcript and the currently registered courses.
    pub async fn course_advisory(&mut self, candidates: &[CourseEntry]) -> Result<Vec<CourseAdvisory>, ObsError> {
        let transcript = self.transcript().await?;
        let current = match self.fetch_page(PageKind::Courses).await?.records {
            PageRecords::Courses(courses) => courses,
            _ => Vec::new(),
        };
        Ok(compute_course_advisory(
            candidates,
            &transcript,
            &current,
            &self.config().analytics,
        ))
    }

    /// Notifications as of `as_of`.
    ///
    /// A page that cannot be read only silences the rules that need it;
    /// session and network failures are still returned.
    pub async fn notifications(&mut self, as_of: NaiveDate) -> Result<Vec<Notification>, ObsError> {
        let profile: Option<Profile> = match self.optional_page(PageKind::Profile).await? {
            Some(PageRecords::Profile(profile)) => Some(*profile),
            _ => None,
        };
        let transcript: Vec<TranscriptEntry> = match self.optional_page(PageKind::Transcript).await? {
            Some(PageRecords::Transcript(entries)) => entries,
            _ => Vec::new(),
        };
        let fees: Vec<FeeRecord> = match self.optional_page(PageKind::Fees).await? {
            Some(PageRecords::Fees(fees)) => fees,
            _ => Vec::new(),
        };
        let attendance: Vec<AttendanceRecord> = match self.optional_page(PageKind::Attendance).await? {
            Some(PageRecords::Attendance(records)) => records,
            _ => Vec::new(),
        };
        Ok(compute_notifications(
            profile.as_ref(),
            &transcript,
            &fees,
            &attendance,
            as_of,
            &self.config().analytics,
        ))
    }

    async fn transcript(&mut self) -> Result<Vec<TranscriptEntry>, ObsError> {
        match self.fetch_page(PageKind::Transcript).await?.records {
            PageRecords::Transcript(entries) => Ok(entries),
            _ => Ok(Vec::new()),
        }
    }

    /// Records of a page, or None if the page is missing or unrecognised.
    async fn optional_page(&mut self, page: PageKind) -> Result<Option<PageRecords>, ObsError> {
        match self.fetch_page(page).await {
            Ok(result) => Ok(Some(result.records)),
            Err(err @ (ObsError::NeedsReauth { .. } | ObsError::StructureNotFound { .. })) => {
                warn!("Skipping {} page: {}", page, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
