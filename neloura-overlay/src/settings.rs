//! Overlay configuration and its refresh cache.
//!
//! Settings arrive as JSON from the host's settings provider, either as a
//! full snapshot or as a pushed partial delta. Both camelCase and
//! snake_case field names are accepted.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::OverlayResult;

pub const DEFAULT_SETTINGS_TTL: Duration = Duration::from_secs(10);
pub const MIN_SETTINGS_TTL: Duration = Duration::from_secs(3);
pub const MAX_SETTINGS_TTL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    #[default]
    Sexagesimal,
    Degrees,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            label_mode: LabelMode::Sexagesimal,
            axis_color: "rgba(160, 140, 200, 0.85)".to_string(),
            tick_color: "rgba(190, 170, 230, 0.95)".to_string(),
            label_color: "#e6dcff".to_string(),
            label_background: "rgba(40, 30, 60, 0.55)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub enabled: bool,
    #[serde(alias = "labelMode")]
    pub label_mode: LabelMode,
    #[serde(alias = "axisColor")]
    pub axis_color: String,
    #[serde(alias = "tickColor")]
    pub tick_color: String,
    #[serde(alias = "labelColor")]
    pub label_color: String,
    #[serde(alias = "labelBackground", alias = "labelBg")]
    pub label_background: String,
}

/// A partial settings update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsDelta {
    pub enabled: Option<bool>,
    #[serde(alias = "labelMode")]
    pub label_mode: Option<LabelMode>,
    #[serde(alias = "axisColor")]
    pub axis_color: Option<String>,
    #[serde(alias = "tickColor")]
    pub tick_color: Option<String>,
    #[serde(alias = "labelColor")]
    pub label_color: Option<String>,
    #[serde(alias = "labelBackground", alias = "labelBg")]
    pub label_background: Option<String>,
}

impl OverlaySettings {
    pub fn from_json(value: &Value) -> OverlayResult<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Merges a delta field by field. Returns whether anything changed.
    pub fn merge(&mut self, delta: SettingsDelta) -> bool {
        let before = self.clone();
        if let Some(enabled) = delta.enabled {
            self.enabled = enabled;
        }
        if let Some(mode) = delta.label_mode {
            self.label_mode = mode;
        }
        if let Some(color) = delta.axis_color {
            self.axis_color = color;
        }
        if let Some(color) = delta.tick_color {
            self.tick_color = color;
        }
        if let Some(color) = delta.label_color {
            self.label_color = color;
        }
        if let Some(color) = delta.label_background {
            self.label_background = color;
        }
        *self != before
    }

    pub fn apply_delta(&mut self, delta: &Value) -> OverlayResult<bool> {
        let delta = SettingsDelta::deserialize(delta)?;
        Ok(self.merge(delta))
    }
}

/// Handle for one in-flight settings fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

/// Effective settings with a TTL and single-flight refresh.
#[derive(Debug, Clone)]
pub struct SettingsCache {
    settings: OverlaySettings,
    ttl: Duration,
    fetched_at: Option<Instant>,
    in_flight: Option<RefreshTicket>,
    next_ticket: u64,
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new(OverlaySettings::default(), DEFAULT_SETTINGS_TTL)
    }
}

impl SettingsCache {
    /// `ttl` is clamped to the 3 to 15 second range.
    pub fn new(initial: OverlaySettings, ttl: Duration) -> Self {
        Self {
            settings: initial,
            ttl: ttl.clamp(MIN_SETTINGS_TTL, MAX_SETTINGS_TTL),
            fetched_at: None,
            in_flight: None,
            next_ticket: 0,
        }
    }

    pub fn current(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        match self.fetched_at {
            Some(at) => now.saturating_duration_since(at) >= self.ttl,
            None => true,
        }
    }

    /// Starts a refresh when the cache is stale and no fetch is pending.
    pub fn begin_refresh(&mut self, now: Instant) -> Option<RefreshTicket> {
        if self.in_flight.is_some() || !self.is_stale(now) {
            return None;
        }
        self.next_ticket += 1;
        let ticket = RefreshTicket(self.next_ticket);
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Finishes the fetch identified by `ticket`. Failed fetches keep the
    /// previous settings until the TTL runs out again. Returns whether the
    /// effective settings changed.
    pub fn complete_refresh<E>(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Value, E>,
        now: Instant,
    ) -> bool
    where
        E: std::fmt::Display,
    {
        if self.in_flight != Some(ticket) {
            debug!(?ticket, "ignoring superseded settings refresh");
            return false;
        }
        self.in_flight = None;
        self.fetched_at = Some(now);

        let parsed = match result {
            Ok(value) => OverlaySettings::from_json(&value),
            Err(err) => {
                warn!(error = %err, "settings fetch failed; keeping previous settings");
                return false;
            }
        };
        match parsed {
            Ok(settings) => {
                let changed = settings != self.settings;
                self.settings = settings;
                changed
            }
            Err(err) => {
                warn!(error = %err, "settings payload rejected; keeping previous settings");
                false
            }
        }
    }

    /// Applies a pushed partial change without refetching.
    pub fn apply_delta(&mut self, delta: &Value) -> bool {
        match self.settings.apply_delta(delta) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(error = %err, "settings delta rejected");
                false
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }
}
