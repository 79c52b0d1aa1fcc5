use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_AUTHORIZER_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_CHANGES_LIMIT: u64 = 1000;
pub const DEFAULT_SUPERUSER_GROUP: &str = "system:masters";

/// Policy plane configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct PolicyPlaneConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub authorizer_timeout: Duration,
    pub superuser_group: String,
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
    pub bootstrap_policy: bool,
}

#[derive(Debug, Deserialize)]
struct PolicyPlaneConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    authorizer_timeout_ms: Option<u64>,
    superuser_group: Option<String>,
    changes_limit: Option<u64>,
    change_retention_max_rows: Option<i64>,
    bootstrap_policy: Option<bool>,
}

impl PolicyPlaneConfig {
    pub fn from_env() -> Result<Self> {
        let metrics_bind = std::env::var("POLICYPLANE_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse POLICYPLANE_METRICS_BIND")?;
        let bind_addr = std::env::var("POLICYPLANE_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8443".to_string())
            .parse()
            .with_context(|| "parse POLICYPLANE_BIND")?;
        let authorizer_timeout_ms = match std::env::var("POLICYPLANE_AUTHORIZER_TIMEOUT_MS") {
            Ok(value) => value
                .parse()
                .with_context(|| "parse POLICYPLANE_AUTHORIZER_TIMEOUT_MS")?,
            Err(_) => DEFAULT_AUTHORIZER_TIMEOUT_MS,
        };
        let superuser_group = std::env::var("POLICYPLANE_SUPERUSER_GROUP")
            .unwrap_or_else(|_| DEFAULT_SUPERUSER_GROUP.to_string());
        let changes_limit = match std::env::var("POLICYPLANE_CHANGES_LIMIT") {
            Ok(value) => value
                .parse()
                .with_context(|| "parse POLICYPLANE_CHANGES_LIMIT")?,
            Err(_) => DEFAULT_CHANGES_LIMIT,
        };
        let change_retention_max_rows = match std::env::var("POLICYPLANE_CHANGE_RETENTION_MAX_ROWS") {
            Ok(value) => Some(
                value
                    .parse()
                    .with_context(|| "parse POLICYPLANE_CHANGE_RETENTION_MAX_ROWS")?,
            ),
            Err(_) => None,
        };
        let bootstrap_policy = match std::env::var("POLICYPLANE_BOOTSTRAP_POLICY") {
            Ok(value) => value
                .parse()
                .with_context(|| "parse POLICYPLANE_BOOTSTRAP_POLICY")?,
            Err(_) => true,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            authorizer_timeout: Duration::from_millis(authorizer_timeout_ms),
            superuser_group,
            changes_limit,
            change_retention_max_rows,
            bootstrap_policy,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("POLICYPLANE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read POLICYPLANE_CONFIG: {path}"))?;
            let override_cfg: PolicyPlaneConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse policy plane config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.authorizer_timeout_ms {
                config.authorizer_timeout = Duration::from_millis(value);
            }
            if let Some(value) = override_cfg.superuser_group {
                config.superuser_group = value;
            }
            if let Some(value) = override_cfg.changes_limit {
                config.changes_limit = value;
            }
            if let Some(value) = override_cfg.change_retention_max_rows {
                config.change_retention_max_rows = Some(value);
            }
            if let Some(value) = override_cfg.bootstrap_policy {
                config.bootstrap_policy = value;
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 8] = [
        "POLICYPLANE_BIND",
        "POLICYPLANE_METRICS_BIND",
        "POLICYPLANE_AUTHORIZER_TIMEOUT_MS",
        "POLICYPLANE_SUPERUSER_GROUP",
        "POLICYPLANE_CHANGES_LIMIT",
        "POLICYPLANE_CHANGE_RETENTION_MAX_ROWS",
        "POLICYPLANE_BOOTSTRAP_POLICY",
        "POLICYPLANE_CONFIG",
    ];

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn clean() -> Self {
            let saved = VARS
                .iter()
                .map(|key| (*key, std::env::var(key).ok()))
                .collect();
            for key in VARS {
                unsafe {
                    std::env::remove_var(key);
                }
            }
            Self { saved }
        }

        fn set(&self, key: &'static str, value: &str) {
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                match value {
                    Some(value) => unsafe {
                        std::env::set_var(key, value);
                    },
                    None => unsafe {
                        std::env::remove_var(key);
                    },
                }
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        let _guard = EnvGuard::clean();
        let config = PolicyPlaneConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.bind_addr, "0.0.0.0:8443".parse().expect("addr"));
        assert_eq!(config.metrics_bind, "0.0.0.0:8080".parse().expect("addr"));
        assert_eq!(config.authorizer_timeout, Duration::from_millis(2000));
        assert_eq!(config.superuser_group, "system:masters");
        assert_eq!(config.changes_limit, 1000);
        assert_eq!(config.change_retention_max_rows, None);
        assert!(config.bootstrap_policy);
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        let guard = EnvGuard::clean();
        guard.set("POLICYPLANE_BIND", "127.0.0.1:9000");
        guard.set("POLICYPLANE_AUTHORIZER_TIMEOUT_MS", "150");
        guard.set("POLICYPLANE_SUPERUSER_GROUP", "admins");
        guard.set("POLICYPLANE_BOOTSTRAP_POLICY", "false");
        guard.set("POLICYPLANE_CHANGE_RETENTION_MAX_ROWS", "5000");
        let config = PolicyPlaneConfig::from_env().expect("config");
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().expect("addr"));
        assert_eq!(config.authorizer_timeout, Duration::from_millis(150));
        assert_eq!(config.superuser_group, "admins");
        assert!(!config.bootstrap_policy);
        assert_eq!(config.change_retention_max_rows, Some(5000));
    }

    #[test]
    #[serial]
    fn invalid_values_are_errors() {
        let guard = EnvGuard::clean();
        guard.set("POLICYPLANE_CHANGES_LIMIT", "many");
        let err = PolicyPlaneConfig::from_env().expect_err("invalid");
        assert!(err.to_string().contains("POLICYPLANE_CHANGES_LIMIT"));

        guard.set("POLICYPLANE_CHANGES_LIMIT", "10");
        guard.set("POLICYPLANE_CHANGE_RETENTION_MAX_ROWS", "lots");
        let err = PolicyPlaneConfig::from_env().expect_err("invalid retention");
        assert!(err.to_string().contains("POLICYPLANE_CHANGE_RETENTION_MAX_ROWS"));
    }

    #[test]
    #[serial]
    fn yaml_overrides_env() {
        let guard = EnvGuard::clean();
        let path = std::env::temp_dir().join(format!(
            "policyplane-config-{}.yaml",
            std::process::id()
        ));
        fs::write(
            &path,
            "metrics_bind: 127.0.0.1:9100\nchanges_limit: 50\nchange_retention_max_rows: 200\nsuperuser_group: root\n",
        )
        .expect("write yaml");
        guard.set("POLICYPLANE_SUPERUSER_GROUP", "admins");
        guard.set("POLICYPLANE_CONFIG", path.to_str().expect("utf8 path"));
        let config = PolicyPlaneConfig::from_env_or_yaml().expect("config");
        let _ = fs::remove_file(&path);
        assert_eq!(config.metrics_bind, "127.0.0.1:9100".parse().expect("addr"));
        assert_eq!(config.changes_limit, 50);
        assert_eq!(config.change_retention_max_rows, Some(200));
        assert_eq!(config.superuser_group, "root");
    }
}
