//! Path-prefix routing table.

use std::fmt;

/// A downstream service the gateway forwards to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upstream {
    Auth,
    Clinic,
}

impl Upstream {
    pub fn name(self) -> &'static str {
        match self {
            Upstream::Auth => "auth-service",
            Upstream::Clinic => "clinic-service",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ROUTES: &[(&str, Upstream)] = &[
    ("/api/auth", Upstream::Auth),
    ("/api/patients", Upstream::Clinic),
    ("/api/doctors", Upstream::Clinic),
    ("/api/visits", Upstream::Clinic),
    ("/api/notifications", Upstream::Clinic),
    ("/api/stats", Upstream::Clinic),
];

/// Upstream owning `path`. A prefix only matches whole segments.
pub fn upstream_for(path: &str) -> Option<Upstream> {
    ROUTES.iter().find_map(|(prefix, upstream)| {
        let rest = path.strip_prefix(prefix)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(*upstream)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_route_to_owning_service() {
        assert_eq!(upstream_for("/api/auth/login"), Some(Upstream::Auth));
        assert_eq!(upstream_for("/api/patients"), Some(Upstream::Clinic));
        assert_eq!(upstream_for("/api/patients/my-data"), Some(Upstream::Clinic));
        assert_eq!(upstream_for("/api/visits/my-visits"), Some(Upstream::Clinic));
        assert_eq!(upstream_for("/api/notifications/read-all"), Some(Upstream::Clinic));
        assert_eq!(upstream_for("/api/stats"), Some(Upstream::Clinic));
    }

    #[test]
    fn test_partial_segments_do_not_match() {
        assert_eq!(upstream_for("/api/authx"), None);
        assert_eq!(upstream_for("/api/statistics"), None);
        assert_eq!(upstream_for("/health"), None);
        assert_eq!(upstream_for("/"), None);
    }
}
