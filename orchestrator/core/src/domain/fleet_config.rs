// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Fleet Configuration Types
//
// Defines the configuration schema for an Overwatch fleet, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Decision engine parameters (sensor radius, threat threshold, warn discount)
// - Target registry staleness TTL
// - Grid dimensions and the protected zone
// - Headless simulation settings and scripted operator commands

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::entity::TargetId;

pub const API_VERSION: &str = "overwatch.io/v1";
pub const KIND: &str = "FleetConfig";

/// Top-level Kubernetes-style fleet configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfigManifest {
    /// API version (must be "overwatch.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "FleetConfig")
    pub kind: String,

    /// Fleet metadata (name, labels)
    pub metadata: ManifestMetadata,

    /// Fleet configuration specification
    #[serde(default)]
    pub spec: FleetSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable fleet name
    pub name: String,

    /// Optional: Labels for categorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Fleet configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetSpec {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub grid: GridSettings,

    #[serde(default)]
    pub protected_zone: ZoneSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Scripted operator commands applied by the simulator
    #[serde(default)]
    pub scenario: Vec<ScenarioStep>,
}

/// Per-agent decision engine parameters (fixed at agent construction)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Sensor radius in grid cells (Chebyshev distance)
    #[serde(default = "default_sensor_radius")]
    pub sensor_radius: i32,

    /// Threat strictly above this value makes a person a candidate
    #[serde(default = "default_threat_threshold")]
    pub threat_threshold: f64,

    /// Multiplier applied to threat when scoring warn-class candidates
    #[serde(default = "default_warn_discount")]
    pub warn_discount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Unlocked entries older than this many time units are swept
    #[serde(default = "default_entry_ttl")]
    pub entry_ttl: u64,
}

/// Largest accepted grid width or height.
pub const MAX_GRID_DIMENSION: u32 = i32::MAX as u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSettings {
    #[serde(default = "default_grid_width")]
    pub width: u32,

    #[serde(default = "default_grid_height")]
    pub height: u32,
}

/// Inclusive protected zone rectangle in grid cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSettings {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Number of drones (named D0..Dn)
    #[serde(default = "default_drones")]
    pub drones: usize,

    /// Initial population (named P0..Pn)
    #[serde(default = "default_persons")]
    pub persons: usize,

    /// Ticks to run
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Wall-clock pause between ticks (0 runs as fast as possible)
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// RNG seed for reproducible runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// An operator command scheduled at a given tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub at_tick: u64,
    pub command: OperatorCommand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OperatorCommand {
    /// Escalate a person's threat score (saturates at 1.0)
    RaiseThreat {
        target: TargetId,
        #[serde(default = "default_threat_raise")]
        amount: f64,
    },
    /// Introduce a new person into the world
    Spawn {
        id: TargetId,
        x: i32,
        y: i32,
        threat: f64,
    },
}

// Default value functions
fn default_sensor_radius() -> i32 {
    4
}

fn default_threat_threshold() -> f64 {
    0.66
}

fn default_warn_discount() -> f64 {
    0.8
}

fn default_entry_ttl() -> u64 {
    20
}

fn default_grid_width() -> u32 {
    28
}

fn default_grid_height() -> u32 {
    20
}

fn default_drones() -> usize {
    3
}

fn default_persons() -> usize {
    12
}

fn default_ticks() -> u64 {
    200
}

fn default_threat_raise() -> f64 {
    0.25
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sensor_radius: default_sensor_radius(),
            threat_threshold: default_threat_threshold(),
            warn_discount: default_warn_discount(),
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            entry_ttl: default_entry_ttl(),
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: default_grid_width(),
            height: default_grid_height(),
        }
    }
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            x1: 10,
            y1: 8,
            x2: 17,
            y2: 15,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            drones: default_drones(),
            persons: default_persons(),
            ticks: default_ticks(),
            tick_interval_ms: 0,
            seed: None,
        }
    }
}

impl Default for FleetConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "default-fleet".to_string(),
                labels: None,
            },
            spec: FleetSpec::default(),
        }
    }
}

impl FleetConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. OVERWATCH_CONFIG_PATH environment variable
    /// 2. ./overwatch-config.yaml (working directory)
    /// 3. ~/.overwatch/config.yaml (user home)
    /// 4. /etc/overwatch/config.yaml (system, Unix) or C:\ProgramData\Overwatch\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("OVERWATCH_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./overwatch-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".overwatch").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/overwatch/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Overwatch\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // 1. Explicit CLI path (Fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        // 2. Discovery (Env -> Cwd -> Home -> System)
        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("OVERWATCH_THREAT_THRESHOLD") {
            match val.trim().parse::<f64>() {
                Ok(threshold) => {
                    tracing::info!("Environment override: OVERWATCH_THREAT_THRESHOLD={}", threshold);
                    self.spec.engine.threat_threshold = threshold;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for OVERWATCH_THREAT_THRESHOLD: '{}'. Expected a number. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("OVERWATCH_SENSOR_RADIUS") {
            match val.trim().parse::<i32>() {
                Ok(radius) => {
                    tracing::info!("Environment override: OVERWATCH_SENSOR_RADIUS={}", radius);
                    self.spec.engine.sensor_radius = radius;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for OVERWATCH_SENSOR_RADIUS: '{}'. Expected an integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("OVERWATCH_ENTRY_TTL") {
            match val.trim().parse::<u64>() {
                Ok(ttl) => {
                    tracing::info!("Environment override: OVERWATCH_ENTRY_TTL={}", ttl);
                    self.spec.registry.entry_ttl = ttl;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for OVERWATCH_ENTRY_TTL: '{}'. Expected a non-negative integer. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let engine = &self.spec.engine;
        if engine.sensor_radius < 0 {
            anyhow::bail!("spec.engine.sensor_radius cannot be negative: {}", engine.sensor_radius);
        }
        if !(0.0..=1.0).contains(&engine.threat_threshold) {
            anyhow::bail!(
                "spec.engine.threat_threshold must be within [0, 1]: {}",
                engine.threat_threshold
            );
        }
        if !(engine.warn_discount > 0.0 && engine.warn_discount <= 1.0) {
            anyhow::bail!(
                "spec.engine.warn_discount must be within (0, 1]: {}",
                engine.warn_discount
            );
        }

        if self.spec.registry.entry_ttl == 0 {
            anyhow::bail!("spec.registry.entry_ttl must be positive");
        }

        let grid = &self.spec.grid;
        if grid.width == 0 || grid.height == 0 {
            anyhow::bail!("spec.grid dimensions must be positive: {}x{}", grid.width, grid.height);
        }
        // cell coordinates are i32
        if grid.width > MAX_GRID_DIMENSION || grid.height > MAX_GRID_DIMENSION {
            anyhow::bail!(
                "spec.grid dimensions cannot exceed {}: {}x{}",
                MAX_GRID_DIMENSION,
                grid.width,
                grid.height
            );
        }

        let zone = &self.spec.protected_zone;
        if zone.x1 > zone.x2 || zone.y1 > zone.y2 {
            anyhow::bail!(
                "spec.protected_zone corners are inverted: ({},{})..({},{})",
                zone.x1, zone.y1, zone.x2, zone.y2
            );
        }
        if !self.in_grid(zone.x1, zone.y1) || !self.in_grid(zone.x2, zone.y2) {
            anyhow::bail!("spec.protected_zone must lie within the grid");
        }

        if self.spec.simulation.drones == 0 {
            anyhow::bail!("spec.simulation.drones must be at least 1");
        }

        self.validate_scenario()
    }

    fn validate_scenario(&self) -> anyhow::Result<()> {
        let mut known: HashSet<TargetId> = (0..self.spec.simulation.persons)
            .map(TargetId::indexed)
            .collect();

        for step in &self.spec.scenario {
            if let OperatorCommand::Spawn { id, x, y, threat } = &step.command {
                if !known.insert(id.clone()) {
                    anyhow::bail!("Scenario spawns duplicate person id: {}", id);
                }
                if !self.in_grid(*x, *y) {
                    anyhow::bail!("Scenario spawn {} at ({},{}) is outside the grid", id, x, y);
                }
                if !(0.0..=1.0).contains(threat) {
                    anyhow::bail!("Scenario spawn {} threat must be within [0, 1]: {}", id, threat);
                }
            }
        }

        for step in &self.spec.scenario {
            if let OperatorCommand::RaiseThreat { target, amount } = &step.command {
                if !known.contains(target) {
                    anyhow::bail!("Scenario raises threat of unknown person: {}", target);
                }
                if !amount.is_finite() || *amount < 0.0 {
                    anyhow::bail!("Scenario threat raise for {} must be non-negative: {}", target, amount);
                }
            }
        }

        Ok(())
    }

    fn in_grid(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.spec.grid.width && (y as u32) < self.spec.grid.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = FleetConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.engine.sensor_radius, 4);
        assert_eq!(manifest.spec.engine.threat_threshold, 0.66);
        assert_eq!(manifest.spec.engine.warn_discount, 0.8);
        assert_eq!(manifest.spec.registry.entry_ttl, 20);
        assert!(manifest.spec.scenario.is_empty());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: overwatch.io/v1
kind: FleetConfig
metadata:
  name: perimeter-north
spec:
  engine:
    threat_threshold: 0.7
  protected_zone: { x1: 2, y1: 2, x2: 6, y2: 6 }
  scenario:
    - at_tick: 5
      command: { action: raise_threat, target: P1 }
    - at_tick: 9
      command: { action: spawn, id: P99, x: 3, y: 4, threat: 0.9 }
"#;
        let manifest = FleetConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "perimeter-north");
        assert_eq!(manifest.spec.engine.threat_threshold, 0.7);
        assert_eq!(manifest.spec.engine.sensor_radius, 4);
        assert_eq!(manifest.spec.registry.entry_ttl, 20);
        assert_eq!(manifest.spec.protected_zone.x2, 6);
        assert_eq!(
            manifest.spec.scenario[0].command,
            OperatorCommand::RaiseThreat {
                target: TargetId::new("P1"),
                amount: 0.25
            }
        );
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overwatch-config.yaml");

        let mut manifest = FleetConfigManifest::default();
        manifest.metadata.name = "harbor".to_string();
        manifest.spec.simulation.seed = Some(7);
        manifest.to_yaml_file(&path).unwrap();

        let loaded = FleetConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, "harbor");
        assert_eq!(loaded.spec.simulation.seed, Some(7));
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(FleetConfigManifest::load_or_default(Some(missing)).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut manifest = FleetConfigManifest::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("OVERWATCH_THREAT_THRESHOLD", "0.5"),
            ("OVERWATCH_SENSOR_RADIUS", "not-a-number"),
            ("OVERWATCH_ENTRY_TTL", "40"),
        ]);
        manifest.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(manifest.spec.engine.threat_threshold, 0.5);
        assert_eq!(manifest.spec.engine.sensor_radius, 4);
        assert_eq!(manifest.spec.registry.entry_ttl, 40);
    }

    #[test]
    fn test_validation() {
        let mut manifest = FleetConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.spec.engine.sensor_radius = -1;
        assert!(manifest.validate().is_err());
        manifest.spec.engine.sensor_radius = 4;

        manifest.spec.engine.threat_threshold = 1.5;
        assert!(manifest.validate().is_err());
        manifest.spec.engine.threat_threshold = 0.66;

        manifest.spec.engine.warn_discount = 0.0;
        assert!(manifest.validate().is_err());
        manifest.spec.engine.warn_discount = 0.8;

        manifest.spec.registry.entry_ttl = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.registry.entry_ttl = 20;

        manifest.spec.protected_zone = ZoneSettings { x1: 9, y1: 0, x2: 3, y2: 4 };
        assert!(manifest.validate().is_err());
        manifest.spec.protected_zone = ZoneSettings { x1: 0, y1: 0, x2: 40, y2: 4 };
        assert!(manifest.validate().is_err());
        manifest.spec.protected_zone = ZoneSettings::default();

        manifest.spec.grid.width = MAX_GRID_DIMENSION + 1;
        assert!(manifest.validate().is_err());
        manifest.spec.grid.width = MAX_GRID_DIMENSION;
        assert!(manifest.validate().is_ok());
        manifest.spec.grid.width = 28;

        manifest.spec.scenario.push(ScenarioStep {
            at_tick: 3,
            command: OperatorCommand::RaiseThreat {
                target: TargetId::new("P404"),
                amount: 0.25,
            },
        });
        assert!(manifest.validate().is_err());
    }
}
