//! obs_client library: client for a server-rendered student information system
//!
//! This library logs in to the records system (replaying the ASP.NET
//! anti-forgery fields the login form carries), fetches its pages through a
//! session that re-authenticates once on expiry, extracts typed records from
//! the irregular HTML, and derives analytics from those records.
//!
//! # Example
//!
//! ```no_run
//! use obs_client::{Config, Credentials, ObsClient, PageKind};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     base_url: "https://obs.example.edu.tr".to_string(),
//!     ..Default::default()
//! };
//!
//! let mut client = ObsClient::new(config)?;
//! client.login(Credentials::new("2012345678", "secret")).await?;
//!
//! let profile = client.fetch_page(PageKind::Profile).await?;
//! if let Some(profile) = profile.profile() {
//!     println!("{:?}: GPA {:?}", profile.name, profile.current_gpa());
//! }
//! let trend = client.gpa_trend().await?;
//! println!("Trend: {:?}", trend.direction);
//!
//! client.logout().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod analytics;
mod client;
pub mod config;
mod error_handling;
pub mod extract;
mod fetch;
pub mod initialization;
pub mod models;
mod pages;
pub mod session;
pub mod transport;
mod utils;

#[cfg(test)]
mod test_helpers;

// Re-export public API
pub use analytics::AnalyticsResult;
pub use client::ObsClient;
pub use config::{AnalyticsConfig, Config, LogFormat, LogLevel, LoginFields, SuccessMarker};
pub use error_handling::{
    AuthFailure, InitializationError, NetworkErrorKind, ObsError, StructureReason, TransportError,
    WarningKind,
};
pub use extract::{ExtractionResult, ExtractionWarning, ExtractorRegistry, PageRecords, PageRule};
pub use fetch::{PageFetcher, PageResult};
pub use pages::PageKind;
pub use session::{AuthState, Credentials, Session, SessionManager};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
