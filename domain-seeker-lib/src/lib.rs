//! # Domain Seeker Library
//!
//! A sequential scanning engine that finds registrable domain names by
//! querying registry RDAP services.
//!
//! Base names come from a [`DomainSource`] (a text file or a generator),
//! are combined with every configured TLD, and are queried one at a time
//! with a fixed pause between query starts. Rate limits and transient
//! failures are retried; anything still unresolved is reported as
//! [`DomainStatus::Unknown`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_seeker_lib::{
//!     FileSource, HttpTransport, NullSink, RdapBootstrap, RdapClient, ScanConfig, Scanner,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::default();
//!     let transport = HttpTransport::new(config.request_timeout, &config.user_agent)?;
//!     let client = RdapClient::new(transport, Arc::new(RdapBootstrap::builtin()));
//!     let scanner = Scanner::new(client, config);
//!
//!     let mut source = FileSource::open("domains.txt")?;
//!     let result = scanner.run(&mut source, &mut NullSink).await?;
//!
//!     for outcome in result.available() {
//!         println!("{} is available", outcome.domain);
//!     }
//!     Ok(())
//! }
//! ```

// Re-export main public API types and functions
pub use config::{
    load_env_config, parse_delay_string, parse_timeout_string, ConfigManager, EnvConfig, FileConfig,
    NotificationSettings, NotifyMethod, Settings,
};
pub use error::DomainSeekerError;
pub use pacing::{pacing_wait, Pacer};
pub use protocols::{
    classify, HttpTransport, RawResponse, RdapBootstrap, RdapClient, RdapTransport,
    TransportError, TransportErrorKind, IANA_BOOTSTRAP_URL,
};
pub use report::{render_markdown, render_text, ScanSummary, TldStats};
pub use retry::{Attempted, RetryController};
pub use scanner::{ResultSink, ScanFailure, ScanStage, Scanner, StopSignal};
pub use sink::{FanoutSink, NullSink, ResultsFileSink};
pub use source::{
    select_source, DomainSource, FileSource, GeneratorFault, GeneratorItem, GeneratorIter,
    GeneratorSource, SourceMode, SourceStats,
};
pub use types::{
    BaseName, CandidateDomain, DomainStatus, QueryOutcome, ScanCompletion, ScanConfig,
    ScanResult, Tld, TldSet,
};
pub use utils::{expand_domain_inputs, is_valid_base_name};

// Public modules
pub mod generate;

// Re-export generation types for convenience
pub use generate::{
    apply_affixes, builtin_generator, configured_generator, estimate_pattern_count,
    expand_pattern, GeneratorSpec, BUILTIN_GENERATORS,
};

// Internal modules - these are not part of the public API
mod config;
mod error;
mod pacing;
mod protocols;
mod report;
mod retry;
mod scanner;
mod sink;
mod source;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainSeekerError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
