//! Authentication configuration structures
//!
//! Loaded from the `[auth]` section: token signing, password hashing,
//! failed-login lockout and an optional administrator seeded at startup.

use serde::{Deserialize, Serialize};

/// Main authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token signing configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Password hashing configuration
    #[serde(default)]
    pub password: PasswordConfig,

    /// Failed-login lockout
    #[serde(default)]
    pub lockout: LockoutConfig,

    /// Administrator created at startup when the email is not registered
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Symmetric JWT signing configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared secret, at least 32 bytes
    #[serde(default)]
    pub secret: String,

    /// HS256, HS384 or HS512 (default: HS256)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// `iss` claim written and required
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// `aud` claim written and required
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Token lifetime in hours (default: 1)
    #[serde(default = "default_duration_hours")]
    pub duration_hours: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: default_algorithm(),
            issuer: default_issuer(),
            audience: default_audience(),
            duration_hours: default_duration_hours(),
        }
    }
}

// keep the secret out of logs
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("duration_hours", &self.duration_hours)
            .finish()
    }
}

/// Password hashing configuration following OWASP guidelines
///
/// Default values are based on OWASP recommendations for Argon2id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    #[serde(default = "default_memory_cost")]
    pub memory_cost_kib: u32,

    /// Time cost / iterations (default: 3)
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,

    /// Parallelism degree (default: 4)
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,

    /// Minimum password length (default: 8)
    #[serde(default = "default_min_length")]
    pub min_password_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost_kib: default_memory_cost(),
            time_cost: default_time_cost(),
            parallelism: default_parallelism(),
            min_password_length: default_min_length(),
        }
    }
}

/// Failed-login lockout
///
/// ```toml
/// [auth.lockout]
/// enabled = true
/// max_attempts = 5
/// window_secs = 900
/// lockout_duration_secs = 300
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Failed attempts that lock the account (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Failures older than this many seconds stop counting (default: 900)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How long a locked account stays locked (default: 300)
    #[serde(default = "default_lockout_duration_secs")]
    pub lockout_duration_secs: u64,
}

impl LockoutConfig {
    /// Reject settings that would lock on every attempt or never expire
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }
        if self.window_secs == 0 {
            return Err("window_secs must be greater than 0".to_string());
        }
        if self.lockout_duration_secs == 0 {
            return Err("lockout_duration_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
            lockout_duration_secs: default_lockout_duration_secs(),
        }
    }
}

/// Seed administrator credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_issuer() -> String {
    "registrar".to_string()
}

fn default_audience() -> String {
    "registrar-api".to_string()
}

fn default_duration_hours() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    900 // 15 minutes
}

fn default_lockout_duration_secs() -> u64 {
    300 // 5 minutes
}

fn default_memory_cost() -> u32 {
    65536 // 64 MiB
}

fn default_time_cost() -> u32 {
    3
}

fn default_parallelism() -> u32 {
    4
}

fn default_min_length() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.jwt.algorithm, "HS256");
        assert_eq!(config.jwt.duration_hours, 1);
        assert_eq!(config.password.min_password_length, 8);
        assert!(config.bootstrap_admin.is_none());
        assert!(config.lockout.enabled);
        assert_eq!(config.lockout.max_attempts, 5);
        assert!(config.lockout.validate().is_ok());
    }

    #[test]
    fn test_lockout_validation() {
        let config = LockoutConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("max_attempts"));

        let config = LockoutConfig {
            lockout_duration_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let jwt = JwtConfig {
            secret: "super-secret-signing-key".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", jwt).contains("super-secret"));

        let admin = BootstrapAdmin {
            email: "root@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        let debug = format!("{:?}", admin);
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("root@example.com"));
    }
}
