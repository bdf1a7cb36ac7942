//! Configuration loading and validation for the failover monitor

use crate::types::{
    AuditTarget, DEFAULT_COMMAND_TEMPLATE, MonitorSettings, ServiceSpec, find_duplicate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "L4_FAILOVER_CONFIG";

/// Upper bound on a single probe timeout or retry delay
pub const MAX_PROBE_DURATION: Duration = Duration::from_secs(3600);

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found in search paths")]
    FileNotFound,

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("No services configured")]
    NoServices,

    #[error("Service {name:?} is invalid: {source}")]
    InvalidService {
        name: String,
        #[source]
        source: validator::ValidationErrors,
    },

    #[error("Service endpoint {0} is configured more than once")]
    DuplicateService(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeSettings,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub actions: ActionSettings,

    #[serde(default)]
    pub audit: AuditSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.probe.validate()?;
        self.scheduler.validate()?;
        self.actions.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// Per-check probe settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProbeSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_probe_timeout")]
    pub timeout: Duration,

    #[validate(range(min = 1, max = 100))]
    pub retries: u32,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_probe_delay")]
    pub delay: Duration,
}

/// Main loop settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SchedulerSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_non_zero")]
    pub loop_interval: Duration,

    pub concurrent: bool,
}

/// Failover command settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ActionSettings {
    pub dry_run: bool,

    #[validate(custom = "validate_command_template")]
    pub command_template: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_non_zero")]
    pub timeout: Duration,
}

/// Audit record settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuditSettings {
    pub sink: AuditTarget,

    #[validate(length(min = 1), custom = "validate_no_nul")]
    pub ident: String,

    #[validate(length(min = 1), custom = "validate_no_nul")]
    pub tag: String,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// One monitored service
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceEntry {
    #[serde(alias = "serviceName")]
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(custom = "validate_host")]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,

    #[validate(custom = "validate_command_ref")]
    pub failscript: String,

    #[validate(custom = "validate_command_ref")]
    pub failbackscript: String,
}

// Default implementations

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            loop_interval: Duration::from_secs(5),
            concurrent: false,
        }
    }
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            dry_run: true,
            command_template: DEFAULT_COMMAND_TEMPLATE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            sink: AuditTarget::Syslog,
            ident: "IP SLA".to_string(),
            tag: "IP-SLA-9-CHANGE".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe: ProbeSettings::default(),
            scheduler: SchedulerSettings::default(),
            actions: ActionSettings::default(),
            audit: AuditSettings::default(),
            logging: LoggingSettings::default(),
            services: Vec::new(),
        }
    }
}

// Custom validators

fn validate_non_zero(duration: &Duration) -> Result<(), ValidationError> {
    if duration.is_zero() {
        return Err(ValidationError::new("duration_zero"));
    }
    Ok(())
}

fn validate_probe_timeout(duration: &Duration) -> Result<(), ValidationError> {
    validate_non_zero(duration)?;
    validate_probe_delay(duration)
}

fn validate_probe_delay(duration: &Duration) -> Result<(), ValidationError> {
    if *duration > MAX_PROBE_DURATION {
        return Err(ValidationError::new("duration_too_long"));
    }
    Ok(())
}

fn validate_command_template(template: &str) -> Result<(), ValidationError> {
    if template.trim().is_empty() {
        return Err(ValidationError::new("command_template_empty"));
    }
    if !template.contains("{}") {
        return Err(ValidationError::new("command_template_missing_placeholder"));
    }
    Ok(())
}

fn validate_no_nul(value: &str) -> Result<(), ValidationError> {
    if value.contains('\0') {
        return Err(ValidationError::new("contains_nul"));
    }
    Ok(())
}

fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.trim().is_empty() {
        return Err(ValidationError::new("host_empty"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("host_contains_whitespace"));
    }
    Ok(())
}

fn validate_command_ref(command: &str) -> Result<(), ValidationError> {
    if command.is_empty() {
        return Err(ValidationError::new("command_empty"));
    }
    // References are substituted into a shell line, so only alias-name characters pass
    if !command
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ValidationError::new("command_contains_shell_metacharacters"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from the default search paths.
    ///
    /// A missing file is an error: the monitor has nothing to watch without one.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => Err(ConfigError::FileNotFound),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and check configuration text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.check()?;
        Ok(config)
    }

    /// Validate every section and the service list.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }

        for entry in &self.services {
            entry.validate().map_err(|source| ConfigError::InvalidService {
                name: entry.name.clone(),
                source,
            })?;
        }

        let specs = self.service_specs();
        if let Some(endpoint) = find_duplicate(&specs) {
            return Err(ConfigError::DuplicateService(endpoint.to_string()));
        }

        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = Vec::new();

        if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
            paths.push(PathBuf::from(explicit));
        }

        paths.push(PathBuf::from("/etc/l4-failover/monitor.yaml"));

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./monitor.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/l4-failover/monitor.yaml"))
    }

    /// Services in configured order
    pub fn service_specs(&self) -> Vec<ServiceSpec> {
        self.services
            .iter()
            .map(|s| {
                ServiceSpec::new(
                    s.name.clone(),
                    s.host.clone(),
                    s.port,
                    s.failscript.clone(),
                    s.failbackscript.clone(),
                )
            })
            .collect()
    }

    /// Convert to MonitorSettings
    pub fn to_settings(&self) -> MonitorSettings {
        MonitorSettings {
            probe_timeout: self.probe.timeout,
            retries: self.probe.retries,
            retry_delay: self.probe.delay,
            loop_interval: self.scheduler.loop_interval,
            concurrent: self.scheduler.concurrent,
            dry_run: self.actions.dry_run,
            command_template: self.actions.command_template.clone(),
            action_timeout: self.actions.timeout,
            audit_target: self.audit.sink,
            audit_ident: self.audit.ident.clone(),
            audit_tag: self.audit.tag.clone(),
        }
    }

    /// Log level, defaulting to info
    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }

    /// Whether logs should be emitted as JSON
    pub fn log_json(&self) -> bool {
        self.logging
            .format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICES: &str = r#"
services:
  - name: Google
    host: www.google.com
    port: 80
    failscript: Google-failure
    failbackscript: Google-failback
  - serviceName: DNS
    host: 1.1.1.1
    port: 53
    failscript: DNS-failure
    failbackscript: DNS-failback
"#;

    #[test]
    fn test_default_sections_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        // ...but there is nothing to monitor
        assert!(matches!(config.check(), Err(ConfigError::NoServices)));
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = Config::from_yaml(SERVICES).unwrap();

        assert_eq!(config.probe.timeout, Duration::from_secs(5));
        assert_eq!(config.probe.retries, 3);
        assert_eq!(config.probe.delay, Duration::from_secs(5));
        assert_eq!(config.scheduler.loop_interval, Duration::from_secs(5));
        assert!(!config.scheduler.concurrent);
        assert!(config.actions.dry_run);
        assert_eq!(config.audit.sink, AuditTarget::Syslog);
        assert_eq!(config.log_level(), "info");
        assert!(!config.log_json());
    }

    #[test]
    fn test_services_keep_order() {
        let config = Config::from_yaml(SERVICES).unwrap();
        let specs = config.service_specs();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "Google");
        assert_eq!(specs[1].name, "DNS");
        assert_eq!(specs[1].endpoint.port, 53);
        assert_eq!(specs[1].on_recovery, "DNS-failback");
    }

    #[test]
    fn test_full_yaml_parsing() {
        let yaml = format!(
            r#"
probe:
  timeout: 2s
  retries: 5
  delay: 500ms

scheduler:
  loop_interval: 10s
  concurrent: true

actions:
  dry_run: false
  command_template: "/usr/local/bin/apply {{}}"
  timeout: 1m

audit:
  sink: log
  ident: monitor
  tag: L4-CHANGE

logging:
  level: debug
  format: json
{SERVICES}"#
        );

        let config = Config::from_yaml(&yaml).unwrap();
        let settings = config.to_settings();

        assert_eq!(settings.probe_timeout, Duration::from_secs(2));
        assert_eq!(settings.retries, 5);
        assert_eq!(settings.retry_delay, Duration::from_millis(500));
        assert_eq!(settings.loop_interval, Duration::from_secs(10));
        assert!(settings.concurrent);
        assert!(!settings.dry_run);
        assert_eq!(settings.command_template, "/usr/local/bin/apply {}");
        assert_eq!(settings.action_timeout, Duration::from_secs(60));
        assert_eq!(settings.audit_target, AuditTarget::Log);
        assert_eq!(settings.audit_tag, "L4-CHANGE");
        assert_eq!(config.log_level(), "debug");
        assert!(config.log_json());
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let yaml = format!("probe:\n  retries: 1\n{SERVICES}");
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.probe.retries, 1);
        assert_eq!(config.probe.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let yaml = format!("probe:\n  timeout: 5s\n  retries: 0\n  delay: 5s\n{SERVICES}");
        assert!(matches!(
            Config::from_yaml(&yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = format!("probe:\n  timeout: 0s\n  retries: 3\n  delay: 5s\n{SERVICES}");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_oversized_probe_durations_rejected() {
        let yaml = format!("probe:\n  timeout: 2h\n{SERVICES}");
        assert!(matches!(
            Config::from_yaml(&yaml),
            Err(ConfigError::ValidationError(_))
        ));

        let yaml = format!("probe:\n  delay: 2h\n{SERVICES}");
        assert!(matches!(
            Config::from_yaml(&yaml),
            Err(ConfigError::ValidationError(_))
        ));

        let yaml = format!("probe:\n  timeout: 10000000000years\n  retries: 100\n{SERVICES}");
        assert!(Config::from_yaml(&yaml).is_err());

        let yaml = format!("probe:\n  timeout: 1h\n  retries: 100\n  delay: 1h\n{SERVICES}");
        assert!(Config::from_yaml(&yaml).is_ok());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let zero = r#"
services:
  - name: Web
    host: 10.0.0.1
    port: 0
    failscript: Web-failure
    failbackscript: Web-failback
"#;
        assert!(matches!(
            Config::from_yaml(zero),
            Err(ConfigError::InvalidService { .. })
        ));

        let too_large = zero.replace("port: 0", "port: 70000");
        assert!(matches!(
            Config::from_yaml(&too_large),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_duplicate_endpoint_rejected() {
        let yaml = r#"
services:
  - name: Web
    host: 10.0.0.1
    port: 80
    failscript: Web-failure
    failbackscript: Web-failback
  - name: Web2
    host: 10.0.0.1
    port: 80
    failscript: Other-failure
    failbackscript: Other-failback
"#;
        match Config::from_yaml(yaml) {
            Err(ConfigError::DuplicateService(endpoint)) => assert_eq!(endpoint, "10.0.0.1:80"),
            other => panic!("Expected DuplicateService, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_service_list_rejected() {
        assert!(matches!(
            Config::from_yaml("services: []"),
            Err(ConfigError::NoServices)
        ));
    }

    #[test]
    fn test_template_requires_placeholder() {
        let yaml = format!(
            "actions:\n  dry_run: false\n  command_template: FastCli\n  timeout: 5s\n{SERVICES}"
        );
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_command_ref_validation() {
        assert!(validate_command_ref("Google-failure").is_ok());
        assert!(validate_command_ref("").is_err());
        assert!(validate_command_ref("   ").is_err());
        assert!(validate_command_ref("x; reboot").is_err());
        assert!(validate_command_ref("$(id)").is_err());
        assert!(validate_command_ref("Bing.v2_fail-over").is_ok());
        assert!(validate_command_ref("x > /etc/foo").is_err());
        assert!(validate_command_ref("a<b").is_err());
        assert!(validate_command_ref("(x)").is_err());
        assert!(validate_command_ref("'quoted'").is_err());
        assert!(validate_command_ref("two words").is_err());
    }

    #[test]
    fn test_host_validation() {
        assert!(validate_host("www.bing.com").is_ok());
        assert!(validate_host("1.1.1.1").is_ok());
        assert!(validate_host("::1").is_ok());
        assert!(validate_host("").is_err());
        assert!(validate_host("bad host").is_err());
    }

    #[test]
    fn test_error_messages_are_readable() {
        assert_eq!(
            ConfigError::FileNotFound.to_string(),
            "Configuration file not found in search paths"
        );
        let boxed: Box<dyn std::error::Error> =
            Box::new(ConfigError::DuplicateService("10.0.0.1:80".to_string()));
        assert_eq!(
            boxed.to_string(),
            "Service endpoint 10.0.0.1:80 is configured more than once"
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("l4-failover-{}.yaml", std::process::id()));
        std::fs::write(&path, SERVICES).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.services.len(), 2);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::IoError(_))
        ));
    }
}
