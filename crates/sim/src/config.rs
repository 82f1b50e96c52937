use std::path::Path;

use anyhow::{Context, Result};
use netmotion::MovementSettings;
use serde::{Deserialize, Serialize};

use crate::channel::PacketLossSimulation;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated seconds.
    pub duration: f32,
    pub tick_rate: u32,
    /// Longest frame fed to the fixed timestep. Anything above is dropped.
    pub max_frame_time: f32,
    pub seed: u64,
    pub network: PacketLossSimulation,
    pub movement: MovementSettings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration: 20.0,
            tick_rate: 60,
            max_frame_time: 0.25,
            seed: 1,
            network: PacketLossSimulation::default(),
            movement: MovementSettings::default(),
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}
