//! RDAP endpoint mapping and IANA bootstrap support.
//!
//! An [`RdapBootstrap`] maps TLDs to RDAP service base URLs. It is built
//! once at startup from the built-in table, optionally merged with the IANA
//! bootstrap registry, and then shared read-only by the query client.

use crate::error::DomainSeekerError;
use crate::types::{Tld, TldSet};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Location of the IANA RDAP bootstrap file for DNS.
pub const IANA_BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// Get the built-in RDAP service base URLs.
///
/// Keys are TLD labels without the leading dot. Values are service bases;
/// the domain path (`domain/<fqdn>`) is appended by [`RdapBootstrap::domain_url`].
pub fn builtin_rdap_services() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        // Popular gTLDs
        ("com", "https://rdap.verisign.com/com/v1/"),
        ("net", "https://rdap.verisign.com/net/v1/"),
        ("org", "https://rdap.publicinterestregistry.org/rdap/"),
        ("info", "https://rdap.identitydigital.services/rdap/"),
        ("biz", "https://rdap.nic.biz/"),
        // Google registry
        ("app", "https://pubapi.registry.google/rdap/"),
        ("dev", "https://pubapi.registry.google/rdap/"),
        ("page", "https://pubapi.registry.google/rdap/"),
        // CentralNic
        ("xyz", "https://rdap.centralnic.com/xyz/"),
        ("tech", "https://rdap.centralnic.com/tech/"),
        ("online", "https://rdap.centralnic.com/online/"),
        ("site", "https://rdap.centralnic.com/site/"),
        ("website", "https://rdap.centralnic.com/website/"),
        ("blog", "https://rdap.blog.fury.ca/rdap/"),
        ("shop", "https://rdap.gmoregistry.net/rdap/"),
        // Identity Digital
        ("ai", "https://rdap.identitydigital.services/rdap/"),
        ("io", "https://rdap.identitydigital.services/rdap/"),
        ("me", "https://rdap.identitydigital.services/rdap/"),
        ("zone", "https://rdap.identitydigital.services/rdap/"),
        ("digital", "https://rdap.identitydigital.services/rdap/"),
        // ccTLDs
        ("us", "https://rdap.nic.us/"),
        ("uk", "https://rdap.nominet.uk/"),
        ("de", "https://rdap.denic.de/"),
        ("ca", "https://rdap.ca.fury.ca/rdap/"),
        ("au", "https://rdap.cctld.au/rdap/"),
        ("fr", "https://rdap.nic.fr/"),
        ("nl", "https://rdap.sidn.nl/"),
        ("br", "https://rdap.registro.br/"),
        ("in", "https://rdap.nixiregistry.in/rdap/"),
        ("ch", "https://rdap.nic.ch/"),
        ("li", "https://rdap.nic.ch/"),
        ("tv", "https://rdap.nic.tv/"),
        ("cc", "https://tld-rdap.verisign.com/cc/v1/"),
        ("cloud", "https://rdap.registry.cloud/rdap/"),
    ])
}

/// Read-only TLD to RDAP service mapping.
#[derive(Debug, Clone, Default)]
pub struct RdapBootstrap {
    services: HashMap<String, String>,
}

impl RdapBootstrap {
    /// An empty mapping. Mostly useful in tests.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The mapping built from the built-in table only.
    pub fn builtin() -> Self {
        let services = builtin_rdap_services()
            .into_iter()
            .map(|(tld, base)| (tld.to_string(), base.to_string()))
            .collect();
        Self { services }
    }

    /// Add or replace one entry.
    pub fn with_service<T: Into<String>, B: Into<String>>(mut self, tld: T, base: B) -> Self {
        let tld = tld.into();
        let key = tld.trim_start_matches('.').to_ascii_lowercase();
        self.services.insert(key, normalize_base(&base.into()));
        self
    }

    /// Parse the IANA bootstrap document (`dns.json`).
    ///
    /// The document holds a `services` array whose entries are
    /// `[[tld, ...], [url, ...]]`; the first URL of each entry is used.
    pub fn from_iana_json(json: &serde_json::Value) -> Result<Self, DomainSeekerError> {
        let services = json
            .get("services")
            .and_then(|s| s.as_array())
            .ok_or_else(|| {
                DomainSeekerError::bootstrap(
                    "*",
                    "Invalid bootstrap JSON: missing or invalid 'services' array",
                )
            })?;

        let mut mapping = HashMap::new();

        for service in services {
            let Some(entry) = service.as_array() else {
                continue;
            };
            if entry.len() < 2 {
                continue;
            }

            let url = entry[1]
                .as_array()
                .and_then(|urls| urls.first())
                .and_then(|u| u.as_str());
            let (Some(url), Some(tlds)) = (url, entry[0].as_array()) else {
                continue;
            };

            let base = normalize_base(url);
            for tld in tlds.iter().filter_map(|t| t.as_str()) {
                mapping.insert(tld.to_ascii_lowercase(), base.clone());
            }
        }

        Ok(Self { services: mapping })
    }

    /// Fetch and parse the IANA bootstrap file.
    pub async fn fetch_iana(
        client: &reqwest::Client,
        url: &str,
        timeout: Duration,
    ) -> Result<Self, DomainSeekerError> {
        info!(url, "Fetching RDAP bootstrap registry");

        let response = client.get(url).timeout(timeout).send().await.map_err(|e| {
            DomainSeekerError::bootstrap("*", format!("Failed to fetch bootstrap registry: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(DomainSeekerError::bootstrap(
                "*",
                format!("Bootstrap registry returned HTTP {}", response.status()),
            ));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            DomainSeekerError::bootstrap("*", format!("Failed to parse bootstrap JSON: {}", e))
        })?;

        let bootstrap = Self::from_iana_json(&json)?;
        debug!(tlds = bootstrap.len(), "Parsed RDAP bootstrap registry");
        Ok(bootstrap)
    }

    /// Merge another mapping in. Entries already present here win.
    pub fn merge(mut self, other: RdapBootstrap) -> Self {
        for (tld, base) in other.services {
            self.services.entry(tld).or_insert(base);
        }
        self
    }

    /// Service base for a TLD.
    ///
    /// Multi-label TLDs (`.co.uk`) are looked up whole first, then by
    /// their last label.
    pub fn endpoint_for(&self, tld: &Tld) -> Option<&str> {
        let label = tld.label();
        self.services
            .get(label)
            .or_else(|| {
                label
                    .rsplit('.')
                    .next()
                    .and_then(|last| self.services.get(last))
            })
            .map(String::as_str)
    }

    /// Full RDAP domain URL, `<base>domain/<fqdn>`.
    pub fn domain_url(&self, tld: &Tld, fqdn: &str) -> Option<String> {
        self.endpoint_for(tld)
            .map(|base| format!("{}domain/{}", base, fqdn))
    }

    /// Fail with a configuration error naming every TLD without an endpoint.
    pub fn ensure_covers(&self, tlds: &TldSet) -> Result<(), DomainSeekerError> {
        let missing: Vec<&str> = tlds
            .iter()
            .filter(|tld| self.endpoint_for(tld).is_none())
            .map(Tld::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainSeekerError::config(format!(
                "no RDAP endpoint known for {} (try --bootstrap)",
                missing.join(", ")
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

// Service bases always end in exactly one slash.
fn normalize_base(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tld(s: &str) -> Tld {
        Tld::parse(s).unwrap()
    }

    #[test]
    fn test_builtin_contains_common_tlds() {
        let bootstrap = RdapBootstrap::builtin();
        assert!(bootstrap.endpoint_for(&tld(".com")).is_some());
        assert!(bootstrap.endpoint_for(&tld(".org")).is_some());
        assert!(bootstrap.endpoint_for(&tld(".net")).is_some());
        assert!(bootstrap.endpoint_for(&tld(".zz")).is_none());
    }

    #[test]
    fn test_all_builtin_bases_are_https_with_trailing_slash() {
        for (tld, base) in builtin_rdap_services() {
            assert!(base.starts_with("https://"), "{} has non-https base", tld);
            assert!(base.ends_with('/'), "{} base lacks trailing slash", tld);
            assert!(!base.ends_with("domain/"), "{} base includes path", tld);
        }
    }

    #[test]
    fn test_domain_url() {
        let bootstrap = RdapBootstrap::builtin();
        assert_eq!(
            bootstrap.domain_url(&tld(".com"), "example.com").unwrap(),
            "https://rdap.verisign.com/com/v1/domain/example.com"
        );
    }

    #[test]
    fn test_multi_label_falls_back_to_last_label() {
        let bootstrap = RdapBootstrap::builtin();
        assert_eq!(
            bootstrap.endpoint_for(&tld(".co.uk")),
            Some("https://rdap.nominet.uk/")
        );
    }

    #[test]
    fn test_from_iana_json() {
        let doc = json!({
            "version": "1.0",
            "services": [
                [["example", "TEST"], ["https://rdap.example.net/v1", "http://fallback/"]],
                [["broken"]],
                "junk"
            ]
        });

        let bootstrap = RdapBootstrap::from_iana_json(&doc).unwrap();
        assert_eq!(bootstrap.len(), 2);
        assert_eq!(
            bootstrap.domain_url(&tld(".test"), "a.test").unwrap(),
            "https://rdap.example.net/v1/domain/a.test"
        );
    }

    #[test]
    fn test_from_iana_json_requires_services() {
        let err = RdapBootstrap::from_iana_json(&json!({"version": "1.0"})).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_merge_prefers_existing_entries() {
        let iana = RdapBootstrap::empty()
            .with_service("com", "https://other.example/")
            .with_service(".dev2", "https://dev2.example");
        let merged = RdapBootstrap::builtin().merge(iana);

        assert_eq!(
            merged.endpoint_for(&tld(".com")),
            Some("https://rdap.verisign.com/com/v1/")
        );
        assert_eq!(merged.endpoint_for(&tld(".dev2")), Some("https://dev2.example/"));
    }

    #[test]
    fn test_ensure_covers_lists_missing() {
        let bootstrap = RdapBootstrap::builtin();
        let tlds = TldSet::parse(&["com", "zz", "qq"]).unwrap();
        let err = bootstrap.ensure_covers(&tlds).unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains(".zz, .qq"));
        assert!(bootstrap
            .ensure_covers(&TldSet::parse(&["com", "org"]).unwrap())
            .is_ok());
    }
}
