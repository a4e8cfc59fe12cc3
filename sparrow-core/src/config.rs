// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use clap::arg_enum;
use serde::Deserialize;

use crate::error::{Result, SparrowError};

// An enum used to configure which cluster-state provider backs a scheduler
// instance. Mirrors the shape of the teacher's `ConfigBackend` switch.
arg_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
    pub enum DeploymentMode {
        Standalone,
        ConfigBased,
        Production,
    }
}

/// Default probe ratios and other process-wide scheduler knobs (spec.md §6,
/// "Configuration keys").
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub bind_host: String,
    pub bind_port: u16,
    pub deployment_mode: DeploymentMode,
    pub default_unconstrained_probe_ratio: f64,
    pub default_constrained_probe_ratio: f64,
    /// Gate for the "spread" input data-shaping rule (spec.md §4.1). The
    /// original describes this as a workload-specific hack, not part of the
    /// algorithm proper; this repo keeps it behind a config flag rather than
    /// always-on, per the Open Question in spec.md §9.
    pub enable_spread_hack: bool,
    /// Static `appId -> worker addresses` table, only consulted by the
    /// config-based cluster-state provider.
    pub static_workers: HashMap<String, Vec<String>>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 50050,
            deployment_mode: DeploymentMode::Standalone,
            default_unconstrained_probe_ratio: 2.0,
            default_constrained_probe_ratio: 2.0,
            enable_spread_hack: true,
            static_workers: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct StaticWorkersFile {
    #[serde(default)]
    applications: HashMap<String, Vec<String>>,
}

impl SchedulerConfig {
    /// Loads the static worker table used by the config-based cluster-state
    /// provider. An unknown deployment mode is validated by the CLI parser
    /// (`clap::arg_enum!`); a malformed static-worker file is a configuration
    /// error and is fatal at startup (spec.md §7, category 1).
    pub fn load_static_workers(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SparrowError::configuration(format!(
                "could not read static worker file {}: {}",
                path.display(),
                e
            ))
        })?;
        let parsed: StaticWorkersFile = toml::from_str(&contents).map_err(|e| {
            SparrowError::configuration(format!(
                "could not parse static worker file {}: {}",
                path.display(),
                e
            ))
        })?;
        self.static_workers = parsed.applications;
        Ok(())
    }
}

/// Scheduler CLI, mirroring the surface the teacher exposes through
/// `configure_me` (bind host/port, deployment backend, probe ratios) but
/// parsed with plain `clap` derive, which the teacher already depends on
/// alongside `configure_me` for the same binary.
#[derive(Debug, clap::Parser)]
#[clap(name = "sparrow-scheduler", about = "Sparrow-style task placement scheduler", version)]
pub struct SchedulerOpt {
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_host: String,

    #[clap(long, default_value = "50050")]
    pub bind_port: u16,

    #[clap(long, possible_values = &DeploymentMode::variants(), case_insensitive = true, default_value = "standalone")]
    pub deployment_mode: String,

    #[clap(long, default_value = "2.0")]
    pub unconstrained_probe_ratio: f64,

    #[clap(long, default_value = "2.0")]
    pub constrained_probe_ratio: f64,

    #[clap(long)]
    pub static_workers_file: Option<std::path::PathBuf>,

    #[clap(long)]
    pub disable_spread_hack: bool,
}

impl SchedulerOpt {
    /// Resolves the CLI options into a `SchedulerConfig`, failing fast
    /// (spec.md §7, category 1) on an unrecognized deployment mode.
    pub fn into_config(self) -> Result<SchedulerConfig> {
        let deployment_mode = self.deployment_mode.parse::<DeploymentMode>().map_err(|_| {
            SparrowError::configuration(format!(
                "unknown deployment mode: {}",
                self.deployment_mode
            ))
        })?;

        let mut config = SchedulerConfig {
            bind_host: self.bind_host,
            bind_port: self.bind_port,
            deployment_mode,
            default_unconstrained_probe_ratio: self.unconstrained_probe_ratio,
            default_constrained_probe_ratio: self.constrained_probe_ratio,
            enable_spread_hack: !self.disable_spread_hack,
            static_workers: HashMap::new(),
        };

        if let Some(path) = self.static_workers_file.as_ref() {
            config.load_static_workers(path)?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_deployment_mode_is_fatal() {
        let res = "bogus".parse::<DeploymentMode>();
        assert!(res.is_err());
    }

    #[test]
    fn default_probe_ratios_are_two() {
        let config = SchedulerConfig::default();
        assert_eq!(config.default_unconstrained_probe_ratio, 2.0);
        assert_eq!(config.default_constrained_probe_ratio, 2.0);
    }

    #[test]
    fn loads_static_workers_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workers.toml");
        std::fs::write(
            &path,
            r#"
            [applications]
            A = ["w1:1000", "w2:1001"]
            "#,
        )
        .unwrap();

        let mut config = SchedulerConfig::default();
        config.load_static_workers(&path).unwrap();
        assert_eq!(config.static_workers.get("A").unwrap().len(), 2);
    }

    #[test]
    fn missing_static_worker_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SchedulerConfig::default();
        let err = config.load_static_workers(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, SparrowError::Configuration(_)));
    }
}
