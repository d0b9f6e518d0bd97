//! RBAC allow/deny enforcement for outbound backend calls.
//!
//! A path pattern's `*` matches exactly one path segment, unless it is the
//! final character of the pattern, in which case it matches any suffix
//! (e.g. `GET /opd/appointments*` matches `/opd/appointments/123`).

/// One (method, path pattern) rule.
struct Rule {
    method: &'static str,
    pattern: &'static str,
}

macro_rules! rule {
    ($method:literal, $pattern:literal) => {
        Rule {
            method: $method,
            pattern: $pattern,
        }
    };
}

/// Checked first; a match here always wins, even over an allow match.
const DENY: &[Rule] = &[
    rule!("DELETE", "/patients/*"),
    rule!("POST", "/lab/orders"),
    rule!("PUT", "/lab/orders/*"),
    rule!("POST", "/users"),
    rule!("PUT", "/users/*"),
    rule!("DELETE", "*"),
];

const ALLOW: &[Rule] = &[
    rule!("POST", "/auth/login"),
    rule!("GET", "/patients/*"),
    rule!("POST", "/patients"),
    rule!("PUT", "/patients/*"),
    rule!("GET", "/departments"),
    rule!("GET", "/departments/*"),
    rule!("POST", "/opd/appointments"),
    rule!("GET", "/opd/appointments*"),
    rule!("PUT", "/opd/appointments/*/checkin"),
    rule!("GET", "/opd/queue"),
    rule!("GET", "/beds"),
    rule!("GET", "/beds/availability"),
    rule!("POST", "/beds/allocate"),
    rule!("POST", "/ipd/admissions"),
    rule!("GET", "/ipd/requests"),
    rule!("POST", "/emergency/cases"),
    rule!("GET", "/emergency/queue"),
    rule!("GET", "/lab/tests"),
    rule!("GET", "/lab/orders*"),
    rule!("GET", "/billing/patient/*"),
    rule!("GET", "/patient/appointments*"),
    rule!("GET", "/patient/appointments/departments"),
    rule!("GET", "/patient/appointments/doctors*"),
    rule!("GET", "/patient/appointments/slots*"),
    rule!("POST", "/patient/appointments"),
];

/// Returns `true` if `method`/`path` is permitted: not matched by any deny
/// rule, and matched by at least one allow rule.
///
/// Any query string is stripped before matching: the allow/deny patterns
/// describe paths, not query parameters, and a `?`-suffixed path would
/// otherwise fail every pattern whose final segment has no trailing `*`
/// (e.g. `/beds?status=available` against the exact rule `GET /beds`).
#[must_use]
pub fn is_permitted(method: &str, path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    if DENY.iter().any(|rule| matches(rule, method, path)) {
        return false;
    }
    ALLOW.iter().any(|rule| matches(rule, method, path))
}

fn matches(rule: &Rule, method: &str, path: &str) -> bool {
    if !rule.method.eq_ignore_ascii_case(method) {
        return false;
    }
    pattern_matches(rule.pattern, path)
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        if !pattern.ends_with("/*") {
            // Trailing-suffix wildcard, e.g. "/opd/appointments*".
            return path.starts_with(prefix);
        }
    }

    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();

    // A pattern ending in "/*" also matches a suffix (any number of
    // trailing segments), matching the spec's single-segment-or-suffix
    // wildcard semantics.
    if pattern.ends_with("/*") {
        let prefix_len = pattern_segments.len() - 1;
        if path_segments.len() < prefix_len {
            return false;
        }
        return pattern_segments[..prefix_len] == path_segments[..prefix_len];
    }

    if pattern_segments.len() != path_segments.len() {
        return false;
    }
    pattern_segments
        .iter()
        .zip(path_segments.iter())
        .all(|(p, s)| *p == "*" || p == s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_exact_match() {
        assert!(is_permitted("GET", "/departments"));
    }

    #[test]
    fn allows_single_segment_wildcard() {
        assert!(is_permitted("GET", "/patients/HIS-2024-0001"));
    }

    #[test]
    fn allows_suffix_wildcard() {
        assert!(is_permitted("GET", "/opd/appointments/123/notes"));
        assert!(is_permitted("GET", "/lab/orders/42"));
    }

    #[test]
    fn allows_middle_wildcard() {
        assert!(is_permitted("PUT", "/opd/appointments/123/checkin"));
    }

    #[test]
    fn deny_wins_over_allow() {
        // Nothing in ALLOW grants DELETE /patients/*, but this exercises
        // deny-checked-first even for an endpoint with no allow rule.
        assert!(!is_permitted("DELETE", "/patients/HIS-2024-0001"));
    }

    #[test]
    fn deny_blocks_lab_order_creation_even_though_get_is_allowed() {
        assert!(!is_permitted("POST", "/lab/orders"));
        assert!(is_permitted("GET", "/lab/orders/42"));
    }

    #[test]
    fn unmatched_endpoint_is_forbidden() {
        assert!(!is_permitted("GET", "/admin/dashboard"));
    }

    #[test]
    fn deny_catches_any_delete() {
        assert!(!is_permitted("DELETE", "/departments/1"));
    }

    #[test]
    fn query_string_is_ignored_for_matching() {
        assert!(is_permitted("GET", "/beds?status=available"));
        assert!(is_permitted("GET", "/patients/search?query=john"));
        assert!(is_permitted("GET", "/opd/appointments?patientId=P1"));
    }

    #[test]
    fn patient_portal_namespace_is_allowed() {
        assert!(is_permitted("GET", "/patient/appointments/departments"));
        assert!(is_permitted(
            "GET",
            "/patient/appointments/doctors?departmentId=3"
        ));
        assert!(is_permitted("POST", "/patient/appointments"));
    }
}
