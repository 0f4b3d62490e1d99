//! Protocol implementations for domain checking.
//!
//! RDAP querying and the TLD to RDAP endpoint mapping.

/// RDAP (Registration Data Access Protocol) query client
pub mod rdap;

/// Endpoint mapping and IANA bootstrap
pub mod registry;

pub use rdap::{
    classify, HttpTransport, RawResponse, RdapClient, RdapTransport, TransportError,
    TransportErrorKind,
};
pub use registry::{RdapBootstrap, IANA_BOOTSTRAP_URL};
