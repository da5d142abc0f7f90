//! Protocol configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use citadel_governance::GovernanceParams;
use citadel_quorum::QuorumParams;
use citadel_treasury::{ForensicParams, MIN_BACKUPS};
use citadel_types::PrincipalId;
use citadel_utils::LogFormat;

use crate::NodeError;

/// Configuration for a Citadel protocol instance.
///
/// Can be loaded from a TOML file via [`ProtocolConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Owner of every component: administers guardians, the reserve,
    /// sealers, governance parameters and veto overrides.
    #[serde(default = "default_owner")]
    pub owner: PrincipalId,

    /// Initial guardian set.
    #[serde(default = "default_guardians")]
    pub guardians: Vec<PrincipalId>,

    /// Approvals needed to activate the forensic switch.
    #[serde(default = "default_required_approvals")]
    pub required_approvals: usize,

    /// Authorized milestone sealers.
    #[serde(default)]
    pub sealers: Vec<PrincipalId>,

    /// Backup principals registered at startup.
    #[serde(default)]
    pub backups: Vec<PrincipalId>,

    /// Principals registered in the stake ledger at startup.
    #[serde(default)]
    pub principals: Vec<GenesisPrincipal>,

    #[serde(default)]
    pub quorum: QuorumParams,

    #[serde(default)]
    pub forensic: ForensicParams,

    #[serde(default)]
    pub governance: GovernanceParams,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// A stake-ledger entry created at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisPrincipal {
    pub id: PrincipalId,
    /// TOML integers are 64-bit.
    pub stake: u64,
    #[serde(default)]
    pub contribution_score: u32,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_owner() -> PrincipalId {
    PrincipalId::new("owner")
}

fn default_guardians() -> Vec<PrincipalId> {
    (1..=3)
        .map(|i| PrincipalId::new(format!("guardian-{i}")))
        .collect()
}

fn default_required_approvals() -> usize {
    2
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ProtocolConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Static checks that do not need a running protocol.
    ///
    /// Component constructors re-validate their own parameters; this catches
    /// cross-section mistakes early with a config-level message.
    pub fn validate(&self) -> Result<(), NodeError> {
        if !self.owner.is_valid() {
            return Err(NodeError::Config(format!("invalid owner {:?}", self.owner.as_str())));
        }
        if self.guardians.is_empty() {
            return Err(NodeError::Config("at least one guardian is required".into()));
        }
        check_unique("guardians", &self.guardians)?;
        check_unique("backups", &self.backups)?;
        let ids: Vec<PrincipalId> = self.principals.iter().map(|p| p.id.clone()).collect();
        check_unique("principals", &ids)?;
        if !self.backups.is_empty() && self.backups.len() < MIN_BACKUPS {
            return Err(NodeError::Config(format!(
                "backups: {} configured, at least {MIN_BACKUPS} required",
                self.backups.len()
            )));
        }
        if self.required_approvals > self.guardians.len() {
            return Err(NodeError::Config(format!(
                "required_approvals {} exceeds {} guardians",
                self.required_approvals,
                self.guardians.len()
            )));
        }
        self.governance
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(())
    }
}

fn check_unique(section: &str, ids: &[PrincipalId]) -> Result<(), NodeError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(NodeError::Config(format!("{section}: duplicate entry {id}")));
        }
    }
    Ok(())
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            guardians: default_guardians(),
            required_approvals: default_required_approvals(),
            sealers: Vec::new(),
            backups: Vec::new(),
            principals: Vec::new(),
            quorum: QuorumParams::default(),
            forensic: ForensicParams::default(),
            governance: GovernanceParams::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ProtocolConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = ProtocolConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ProtocolConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.guardians.len(), 3);
        assert_eq!(config.required_approvals, 2);
        assert_eq!(config.quorum, QuorumParams::default());
        assert_eq!(config.log_format, LogFormat::Human);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            owner = "root"
            guardians = ["a", "b"]
            required_approvals = 1
            log_format = "json"

            [forensic]
            block_detection_threshold = 9

            [governance]
            quorum_percent = 25

            [[principals]]
            id = "alice"
            stake = 100
        "#;
        let config = ProtocolConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.owner, PrincipalId::new("root"));
        assert_eq!(config.forensic.block_detection_threshold, 9);
        assert_eq!(config.forensic.reactivation_cooldown_secs, 86_400); // default
        assert_eq!(config.governance.quorum_percent, 25);
        assert_eq!(config.principals[0].contribution_score, 0);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn validate_catches_cross_section_mistakes() {
        let mut config = ProtocolConfig {
            required_approvals: 4,
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());

        config.required_approvals = 2;
        config.backups = vec![PrincipalId::new("b1"), PrincipalId::new("b2")];
        assert!(config.validate().is_err());

        config.backups.push(PrincipalId::new("b1"));
        assert!(matches!(config.validate(), Err(NodeError::Config(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "required_approvals = 3").unwrap();
        let config = ProtocolConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.required_approvals, 3);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = ProtocolConfig::from_toml_file("/nonexistent/citadel.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
