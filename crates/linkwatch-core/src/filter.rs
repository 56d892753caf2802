//! GUID-like name predicates
//!
//! Some platforms expose virtual adapters (tunnels, filter drivers, ISATAP
//! pseudo-interfaces) whose *names* are bare GUIDs. The reconciler can
//! suppress notifications for those adapters; these predicates decide which
//! names qualify.
//!
//! Both functions are pure. The compiled patterns are process-wide statics
//! and are never mutated after first use.

use regex::Regex;
use std::sync::OnceLock;

const GUID_BODY: &str = r"\{?[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\}?";

static GUID_ANYWHERE: OnceLock<Regex> = OnceLock::new();
static GUID_EXACT: OnceLock<Regex> = OnceLock::new();

fn guid_anywhere() -> &'static Regex {
    GUID_ANYWHERE.get_or_init(|| Regex::new(GUID_BODY).expect("GUID pattern is valid"))
}

fn guid_exact() -> &'static Regex {
    GUID_EXACT.get_or_init(|| {
        Regex::new(&format!("^{GUID_BODY}$")).expect("anchored GUID pattern is valid")
    })
}

/// Whether `name` contains at least one 8-4-4-4-12 hex group, optionally braced
///
/// ```
/// use linkwatch_core::filter::contains_guid;
///
/// assert!(contains_guid("{3F2504E0-4F89-11D3-9A0C-0305E82C3301}"));
/// assert!(contains_guid("isatap.{3F2504E0-4F89-11D3-9A0C-0305E82C3301}"));
/// assert!(!contains_guid("eth0"));
/// ```
pub fn contains_guid(name: &str) -> bool {
    guid_anywhere().is_match(name)
}

/// Whether `name` is exactly one GUID, optionally braced
pub fn is_guid(name: &str) -> bool {
    guid_exact().is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUID: &str = "3F2504E0-4F89-11D3-9A0C-0305E82C3301";

    #[test]
    fn test_exact_match() {
        assert!(is_guid(GUID));
        assert!(is_guid(&format!("{{{GUID}}}")));
        assert!(is_guid(&GUID.to_lowercase()));
        assert!(!is_guid(&format!("adapter {GUID}")));
        assert!(!is_guid(""));
    }

    #[test]
    fn test_embedded_match() {
        assert!(contains_guid(&format!("Local Area Connection* {GUID}")));
        assert!(contains_guid(&format!("{{{GUID}}}-WFP")));
        assert!(!contains_guid("Local Area Connection 2"));
        assert!(!contains_guid(""));
    }

    #[test]
    fn test_rejects_wrong_grouping() {
        // 8-4-4-4-11
        assert!(!contains_guid("3F2504E0-4F89-11D3-9A0C-0305E82C330"));
        // non-hex digit
        assert!(!contains_guid("3F2504E0-4F89-11D3-9A0C-0305E82C330G"));
        // no dashes
        assert!(!contains_guid("3F2504E04F8911D39A0C0305E82C3301"));
    }
}
