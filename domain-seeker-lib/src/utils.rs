//! Utility functions for name validation and TLD expansion.
//!
//! The character rules here are shared by every domain source so a name is
//! judged the same way whether it came from a file or a generator.

use crate::types::{BaseName, CandidateDomain, Tld, TldSet};
use lazy_static::lazy_static;
use regex::Regex;

/// Maximum length of a single DNS label.
pub const MAX_LABEL_LENGTH: usize = 63;

lazy_static! {
    // One label: alphanumerics and inner hyphens, no leading or trailing hyphen.
    static ref LABEL_RE: Regex = Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$")
        .expect("label pattern is valid");
}

/// Check a normalized (trimmed, lowercase) base name against the label rule.
pub fn is_valid_base_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_LABEL_LENGTH && LABEL_RE.is_match(name)
}

/// Explain why a base name was rejected, for log messages.
pub(crate) fn base_name_rejection(name: &str) -> &'static str {
    if name.is_empty() {
        "empty name"
    } else if name.len() > MAX_LABEL_LENGTH {
        "longer than 63 characters"
    } else if name.starts_with('-') || name.ends_with('-') {
        "starts or ends with a hyphen"
    } else {
        "only letters, digits and hyphens are allowed"
    }
}

/// Check every dot-separated label of a TLD (without its leading dot).
pub(crate) fn is_valid_tld_labels(tld: &str) -> bool {
    !tld.is_empty() && tld.split('.').all(is_valid_base_name)
}

/// Expand one base name across the configured TLDs, in TLD order.
pub fn candidates_for<'a>(
    base: &'a BaseName,
    tlds: &'a TldSet,
) -> impl Iterator<Item = CandidateDomain> + 'a {
    tlds.iter()
        .map(move |tld: &Tld| CandidateDomain::new(base.clone(), tld.clone()))
}

/// Expand a list of base names into fully qualified domain names.
///
/// The result is the Cartesian product in base-name-major order, which is
/// the same order the scanner queries in.
pub fn expand_domain_inputs(bases: &[BaseName], tlds: &TldSet) -> Vec<String> {
    bases
        .iter()
        .flat_map(|base| candidates_for(base, tlds))
        .map(|candidate| candidate.fqdn())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_base_name() {
        assert!(is_valid_base_name("example"));
        assert!(is_valid_base_name("test-domain"));
        assert!(is_valid_base_name("abc123"));
        assert!(is_valid_base_name("a"));
        assert!(is_valid_base_name("zzqxw7"));

        assert!(!is_valid_base_name(""));
        assert!(!is_valid_base_name("-bad-"));
        assert!(!is_valid_base_name("-example"));
        assert!(!is_valid_base_name("example-"));
        assert!(!is_valid_base_name("test.com"));
        assert!(!is_valid_base_name("under_score"));
        assert!(!is_valid_base_name("Upper")); // callers lowercase first
        assert!(!is_valid_base_name(&"a".repeat(64)));
        assert!(is_valid_base_name(&"a".repeat(63)));
    }

    #[test]
    fn test_base_name_rejection_reason() {
        assert_eq!(base_name_rejection("-bad-"), "starts or ends with a hyphen");
        assert_eq!(base_name_rejection(""), "empty name");
        assert_eq!(
            base_name_rejection("a b"),
            "only letters, digits and hyphens are allowed"
        );
    }

    #[test]
    fn test_tld_labels() {
        assert!(is_valid_tld_labels("com"));
        assert!(is_valid_tld_labels("co.uk"));
        assert!(!is_valid_tld_labels(""));
        assert!(!is_valid_tld_labels("co..uk"));
        assert!(!is_valid_tld_labels("-com"));
    }

    #[test]
    fn test_expand_domain_inputs_order() {
        let bases = vec![
            BaseName::parse("alpha").unwrap(),
            BaseName::parse("beta").unwrap(),
        ];
        let tlds = TldSet::parse(&["com", ".org"]).unwrap();

        assert_eq!(
            expand_domain_inputs(&bases, &tlds),
            vec!["alpha.com", "alpha.org", "beta.com", "beta.org"]
        );
    }
}
