//! Configuration for Adlite

use crate::types::AuthMethod;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdliteConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ldap: LdapConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub tickets: TicketConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AdliteConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from defaults overridden by `lookup`, which
    /// resolves the environment variable names the directory server uses.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("AD_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("AD_PORT").and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }
        if let Some(base_dn) = lookup("AD_BASE_DN") {
            config.server.base_dn = base_dn;
        }
        if let Some(timeout) = lookup("LDAP_TIMEOUT").and_then(|t| t.parse().ok()) {
            config.ldap.timeout = timeout;
        }
        if let Some(size) = lookup("LDAP_MAX_PAGE_SIZE").and_then(|s| s.parse().ok()) {
            config.ldap.max_page_size = size;
        }
        if let Some(method) = lookup("AUTH_DEFAULT_METHOD").and_then(|m| m.parse().ok()) {
            config.auth.default_method = method;
        }
        if let Some(enabled) = lookup("KRB5_ENABLED") {
            config.auth.kerberos.enabled = enabled == "true" || enabled == "1";
        }
        if let Some(realm) = lookup("KRB5_REALM") {
            config.auth.kerberos.realm = realm;
        }
        if let Some(kdc) = lookup("KRB5_KDC") {
            config.auth.kerberos.kdc = kdc;
        }
        if let Some(url) = lookup("ADLITE_DATABASE_URL") {
            config.database.url = url;
        }
        if let Some(level) = lookup("ADLITE_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.server.base_dn.trim().is_empty() {
            return Err(crate::Error::InvalidConfig("server.baseDN must not be empty".into()));
        }
        if self.ldap.timeout == 0 {
            return Err(crate::Error::InvalidConfig("ldap.timeout must be positive".into()));
        }
        if self.ldap.max_page_size == 0 {
            return Err(crate::Error::InvalidConfig(
                "ldap.maxPageSize must be positive".into(),
            ));
        }
        if self.auth.kerberos.enabled {
            self.auth.kerberos.validate()?;
        }
        self.tickets.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(rename = "baseDN", default = "default_base_dn")]
    pub base_dn: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3389
}

fn default_base_dn() -> String {
    crate::DEFAULT_BASE_DN.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_dn: default_base_dn(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdapConfig {
    /// Bind timeout in milliseconds
    #[serde(default = "default_ldap_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_ldap_timeout() -> u64 {
    30_000
}

fn default_max_page_size() -> u32 {
    1000
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            timeout: default_ldap_timeout(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl LdapConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub default_method: AuthMethod,

    #[serde(default)]
    pub kerberos: KerberosConfig,
}

/// What happens when a principal completes a second AS exchange while its
/// first TGT is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// The newer TGT replaces the older one; tickets bound to the old
    /// session key stop validating.
    #[default]
    LastWriteWins,
    /// The AS exchange is refused until the active TGT expires or is revoked.
    Exclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KerberosConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_realm")]
    pub realm: String,

    #[serde(default = "default_kdc")]
    pub kdc: String,

    /// Name prefixes of service accounts allowed to perform protocol transition
    #[serde(default = "default_service_prefixes")]
    pub service_prefixes: Vec<String>,

    #[serde(default)]
    pub session_policy: SessionPolicy,
}

fn default_true() -> bool {
    true
}

fn default_realm() -> String {
    crate::DEFAULT_REALM.to_string()
}

fn default_kdc() -> String {
    "kdc.domain.com".to_string()
}

fn default_service_prefixes() -> Vec<String> {
    vec!["svc_".to_string(), "service_".to_string()]
}

impl Default for KerberosConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            realm: default_realm(),
            kdc: default_kdc(),
            service_prefixes: default_service_prefixes(),
            session_policy: SessionPolicy::default(),
        }
    }
}

impl KerberosConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.realm.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "auth.kerberos.realm must not be empty".into(),
            ));
        }
        if self.kdc.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "auth.kerberos.kdc must not be empty".into(),
            ));
        }
        if self.service_prefixes.iter().any(|p| p.is_empty()) {
            return Err(crate::Error::InvalidConfig(
                "auth.kerberos.servicePrefixes must not contain an empty prefix".into(),
            ));
        }
        Ok(())
    }
}

/// Longest lifetime or interval accepted for any ticket setting (one year)
pub const MAX_TICKET_LIFETIME_SECS: u64 = 366 * 24 * 3600;

/// Ticket lifetimes and sweep cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TicketConfig {
    pub pre_auth_lifetime_secs: u64,
    pub tgt_lifetime_secs: u64,
    pub service_ticket_lifetime_secs: u64,
    pub transition_ticket_lifetime_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            pre_auth_lifetime_secs: 120,
            tgt_lifetime_secs: 36_000,
            service_ticket_lifetime_secs: 3600,
            transition_ticket_lifetime_secs: 3600,
            cleanup_interval_secs: 60,
        }
    }
}

impl TicketConfig {
    pub fn pre_auth_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.pre_auth_lifetime_secs as i64)
    }

    pub fn tgt_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.tgt_lifetime_secs as i64)
    }

    pub fn service_ticket_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.service_ticket_lifetime_secs as i64)
    }

    pub fn transition_ticket_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.transition_ticket_lifetime_secs as i64)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn validate(&self) -> crate::Result<()> {
        let lifetimes = [
            ("preAuthLifetimeSecs", self.pre_auth_lifetime_secs),
            ("tgtLifetimeSecs", self.tgt_lifetime_secs),
            ("serviceTicketLifetimeSecs", self.service_ticket_lifetime_secs),
            ("transitionTicketLifetimeSecs", self.transition_ticket_lifetime_secs),
            ("cleanupIntervalSecs", self.cleanup_interval_secs),
        ];
        for (name, value) in lifetimes {
            if value == 0 {
                return Err(crate::Error::InvalidConfig(format!(
                    "tickets.{} must be positive",
                    name
                )));
            }
            if value > MAX_TICKET_LIFETIME_SECS {
                return Err(crate::Error::InvalidConfig(format!(
                    "tickets.{} must not exceed {}",
                    name, MAX_TICKET_LIFETIME_SECS
                )));
            }
        }

        // A pre-auth proof must never outlive the TGT it unlocks
        if self.pre_auth_lifetime_secs > self.tgt_lifetime_secs {
            return Err(crate::Error::InvalidConfig(
                "tickets.preAuthLifetimeSecs must not exceed tickets.tgtLifetimeSecs".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://ad_data.sqlite?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AdliteConfig::default();

        assert_eq!(config.server.port, 3389);
        assert_eq!(config.server.base_dn, "dc=mycompany,dc=com");
        assert_eq!(config.ldap.timeout, 30_000);
        assert_eq!(config.ldap.max_page_size, 1000);
        assert_eq!(config.auth.default_method, AuthMethod::Basic);
        assert!(config.auth.kerberos.enabled);
        assert_eq!(config.auth.kerberos.realm, "DOMAIN.COM");
        assert_eq!(config.tickets.pre_auth_lifetime(), chrono::Duration::minutes(2));
        assert_eq!(config.tickets.tgt_lifetime(), chrono::Duration::hours(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_uses_directory_key_names() {
        let config = AdliteConfig::from_toml(
            r#"
            [server]
            host = "0.0.0.0"
            port = 1389
            baseDN = "dc=test,dc=com"

            [ldap]
            timeout = 5000
            maxPageSize = 200

            [auth]
            defaultMethod = "kerberos"

            [auth.kerberos]
            enabled = true
            realm = "TEST.COM"
            kdc = "kdc.test.com"
            sessionPolicy = "exclusive"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 1389);
        assert_eq!(config.server.base_dn, "dc=test,dc=com");
        assert_eq!(config.ldap.timeout_duration(), Duration::from_millis(5000));
        assert_eq!(config.ldap.max_page_size, 200);
        assert_eq!(config.auth.default_method, AuthMethod::Kerberos);
        assert_eq!(config.auth.kerberos.realm, "TEST.COM");
        assert_eq!(config.auth.kerberos.session_policy, SessionPolicy::Exclusive);
        // Unspecified fields keep their defaults
        assert_eq!(config.auth.kerberos.service_prefixes, vec!["svc_", "service_"]);
        assert_eq!(config.tickets.cleanup_interval_secs, 60);
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("AD_PORT", "1636"),
            ("AD_BASE_DN", "dc=corp,dc=local"),
            ("LDAP_TIMEOUT", "not-a-number"),
            ("KRB5_REALM", "CORP.LOCAL"),
            ("KRB5_ENABLED", "false"),
        ]
        .into_iter()
        .collect();

        let config = AdliteConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 1636);
        assert_eq!(config.server.base_dn, "dc=corp,dc=local");
        // Unparseable values fall back to the default
        assert_eq!(config.ldap.timeout, 30_000);
        assert_eq!(config.auth.kerberos.realm, "CORP.LOCAL");
        assert!(!config.auth.kerberos.enabled);
    }

    #[test]
    fn test_validation() {
        let mut config = AdliteConfig::default();
        config.tickets.pre_auth_lifetime_secs = config.tickets.tgt_lifetime_secs + 1;
        assert!(config.validate().is_err());

        let mut config = AdliteConfig::default();
        config.auth.kerberos.realm = "  ".to_string();
        assert!(config.validate().is_err());

        // Realm only matters when the ticket method is enabled
        config.auth.kerberos.enabled = false;
        assert!(config.validate().is_ok());

        let mut config = AdliteConfig::default();
        config.ldap.timeout = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ticket_lifetime_upper_bound() {
        let mut tickets = TicketConfig {
            tgt_lifetime_secs: MAX_TICKET_LIFETIME_SECS,
            service_ticket_lifetime_secs: MAX_TICKET_LIFETIME_SECS,
            ..Default::default()
        };
        assert!(tickets.validate().is_ok());
        assert_eq!(tickets.tgt_lifetime(), chrono::Duration::days(366));

        tickets.tgt_lifetime_secs = u64::MAX;
        assert!(matches!(
            tickets.validate(),
            Err(crate::Error::InvalidConfig(msg)) if msg.contains("tgtLifetimeSecs")
        ));

        let tickets = TicketConfig {
            cleanup_interval_secs: MAX_TICKET_LIFETIME_SECS + 1,
            ..Default::default()
        };
        assert!(tickets.validate().is_err());
    }
}
