//! Who may act on behalf of other principals

use adlite_core::config::KerberosConfig;
use adlite_core::MACHINE_ACCOUNT_SUFFIX;

/// Decides which principals are service or machine accounts eligible for
/// protocol transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationPolicy {
    machine_suffix: char,
    service_prefixes: Vec<String>,
}

impl Default for DelegationPolicy {
    fn default() -> Self {
        Self::from_config(&KerberosConfig::default())
    }
}

impl DelegationPolicy {
    pub fn new<I, S>(service_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            machine_suffix: MACHINE_ACCOUNT_SUFFIX,
            service_prefixes: service_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &KerberosConfig) -> Self {
        Self::new(config.service_prefixes.iter().cloned())
    }

    pub fn service_prefixes(&self) -> &[String] {
        &self.service_prefixes
    }

    pub fn allows(&self, principal: &str) -> bool {
        principal.ends_with(self.machine_suffix)
            || self
                .service_prefixes
                .iter()
                .any(|prefix| !prefix.is_empty() && principal.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = DelegationPolicy::default();

        assert!(policy.allows("WORKSTATION1$"));
        assert!(policy.allows("svc_web"));
        assert!(policy.allows("service_backup"));
        assert!(!policy.allows("alice"));
        assert!(!policy.allows("my_svc_web"));
    }

    #[test]
    fn test_custom_prefixes() {
        let policy = DelegationPolicy::new(["app-", ""]);

        assert!(policy.allows("app-gateway"));
        assert!(policy.allows("HOST$"));
        // An empty prefix never turns every account into a service account
        assert!(!policy.allows("svc_web"));
    }
}
