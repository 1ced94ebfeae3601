use std::time::Duration as StdDuration;

use anyhow::{bail, Context as _};
use chrono::Duration;
use serde::{Deserialize, Deserializer};

/// Upper bound for every configured duration: one day.
pub const MAX_MINUTES: i64 = 24 * 60;
const MAX_INTERVAL: StdDuration = StdDuration::from_secs(MAX_MINUTES as u64 * 60);

/// Bus identifiers the demo starts with, in seeding order.
pub const DEFAULT_SEED_IDS: [&str; 4] = [
    "14d sivajinagar",
    "13E MMroad",
    "306 cleveland",
    " 16g MG road",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time between two simulation ticks, written like `"2s"` or `"500ms"`.
    #[serde(deserialize_with = "deserialize_interval")]
    pub tick_interval: StdDuration,
    pub seed_ids: Vec<String>,
    pub base_speed_kmph: u32,
    pub speed_increment_kmph: u32,
    pub timing: EtaTiming,
    pub initial_zoom: u8,
    pub focus_zoom: u8,
}

/// Fixed travel-time assumptions behind every ETA shown to the user.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EtaTiming {
    pub minutes_per_stop: i64,
    pub buffer_minutes: i64,
    pub next_stop_minutes: i64,
}

impl EtaTiming {
    pub fn minutes_to_destination(&self, remaining_stops: usize) -> i64 {
        i64::try_from(remaining_stops)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.minutes_per_stop)
            .saturating_add(self.buffer_minutes)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, minutes) in [
            ("minutes_per_stop", self.minutes_per_stop),
            ("buffer_minutes", self.buffer_minutes),
            ("next_stop_minutes", self.next_stop_minutes),
        ] {
            if !(0..=MAX_MINUTES).contains(&minutes) {
                bail!("{name} must be between 0 and {MAX_MINUTES}, got {minutes}");
            }
        }
        Ok(())
    }
}

impl Default for EtaTiming {
    fn default() -> Self {
        Self {
            minutes_per_stop: 2,
            buffer_minutes: 2,
            next_stop_minutes: 2,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: StdDuration::from_secs(2),
            seed_ids: DEFAULT_SEED_IDS.iter().map(|s| s.to_string()).collect(),
            base_speed_kmph: 20,
            speed_increment_kmph: 5,
            timing: EtaTiming::default(),
            initial_zoom: 13,
            focus_zoom: 15,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_interval.is_zero() {
            bail!("tick interval must be positive");
        }
        if self.tick_interval > MAX_INTERVAL {
            bail!(
                "tick interval {} is longer than {}",
                humantime::format_duration(self.tick_interval),
                humantime::format_duration(MAX_INTERVAL)
            );
        }
        self.interval()?;
        self.timing.validate().context("invalid ETA timing")?;
        let buses = u32::try_from(self.seed_ids.len()).context("too many seed ids")?;
        self.speed_kmph(buses.saturating_sub(1))
            .context("speed of the last seeded bus overflows")?;
        Ok(())
    }

    /// Speed of the `k`-th seeded bus, `None` when it does not fit.
    pub fn speed_kmph(&self, k: u32) -> Option<u32> {
        k.checked_mul(self.speed_increment_kmph)?
            .checked_add(self.base_speed_kmph)
    }

    pub fn interval(&self) -> anyhow::Result<Duration> {
        Duration::from_std(self.tick_interval).context("tick interval is out of range")
    }
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<StdDuration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    humantime::parse_duration(&value).map_err(serde::de::Error::custom)
}

#[test]
fn test_default_config_is_valid() {
    let config = SessionConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.interval().unwrap(), Duration::seconds(2));
    assert_eq!(config.seed_ids.len(), 4);
}

#[test]
fn test_deserialize_partial_config() {
    let config: SessionConfig =
        serde_json::from_str(r#"{ "tick_interval": "500ms", "seed_ids": ["A", "B"] }"#).unwrap();
    assert_eq!(config.tick_interval, StdDuration::from_millis(500));
    assert_eq!(config.seed_ids, vec!["A", "B"]);
    assert_eq!(config.base_speed_kmph, 20);
    assert_eq!(config.timing, EtaTiming::default());
}

#[test]
fn test_zero_interval_rejected() {
    let config: SessionConfig = serde_json::from_str(r#"{ "tick_interval": "0s" }"#).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_huge_interval_rejected() {
    let config: SessionConfig =
        serde_json::from_str(r#"{ "tick_interval": "1000000years" }"#).unwrap();
    assert!(config.validate().is_err());
    let config: SessionConfig = serde_json::from_str(r#"{ "tick_interval": "1day" }"#).unwrap();
    assert!(config.validate().is_ok());
}

#[test]
fn test_negative_timing_rejected() {
    let config: SessionConfig =
        serde_json::from_str(r#"{ "timing": { "minutes_per_stop": -5 } }"#).unwrap();
    assert!(config.validate().is_err());
    let config: SessionConfig =
        serde_json::from_str(r#"{ "timing": { "buffer_minutes": -5 } }"#).unwrap();
    assert!(config.validate().is_err());
    let config: SessionConfig =
        serde_json::from_str(r#"{ "timing": { "next_stop_minutes": -1 } }"#).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_oversized_timing_rejected() {
    let config: SessionConfig =
        serde_json::from_str(r#"{ "timing": { "next_stop_minutes": 9223372036854775807 } }"#)
            .unwrap();
    assert!(config.validate().is_err());
    let config: SessionConfig =
        serde_json::from_str(r#"{ "timing": { "minutes_per_stop": 1441 } }"#).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_speed_overflow_rejected() {
    let config: SessionConfig =
        serde_json::from_str(r#"{ "base_speed_kmph": 4294967295, "speed_increment_kmph": 1 }"#)
            .unwrap();
    assert!(config.validate().is_err());
    // a single bus never adds the increment
    let config: SessionConfig = serde_json::from_str(
        r#"{ "base_speed_kmph": 4294967295, "speed_increment_kmph": 1, "seed_ids": ["a"] }"#,
    )
    .unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(SessionConfig::default().speed_kmph(3), Some(35));
}

#[test]
fn test_minutes_to_destination_never_overflows() {
    let timing = EtaTiming {
        minutes_per_stop: MAX_MINUTES,
        buffer_minutes: MAX_MINUTES,
        next_stop_minutes: 0,
    };
    assert_eq!(timing.minutes_to_destination(usize::MAX), i64::MAX);
    assert_eq!(EtaTiming::default().minutes_to_destination(0), 2);
}
