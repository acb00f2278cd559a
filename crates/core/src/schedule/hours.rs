//! Daily operating window.

use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Operating-hours section of the kiosk config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingHoursConfig {
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,
    #[serde(default)]
    pub open_minute: u32,
    #[serde(default)]
    pub close_hour: u32,
    #[serde(default = "default_close_minute")]
    pub close_minute: u32,

    /// Seconds between checks of the wall clock.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: f64,

    /// Screen shown while the kiosk is closed.
    #[serde(default = "default_closed_screen")]
    pub closed_screen: String,
}

fn default_open_hour() -> u32 {
    6
}

fn default_close_minute() -> u32 {
    30
}

fn default_check_interval() -> f64 {
    100.0
}

fn default_closed_screen() -> String {
    "closed".to_string()
}

impl Default for OperatingHoursConfig {
    fn default() -> Self {
        Self {
            open_hour: default_open_hour(),
            open_minute: 0,
            close_hour: 0,
            close_minute: default_close_minute(),
            check_interval_secs: default_check_interval(),
            closed_screen: default_closed_screen(),
        }
    }
}

impl OperatingHoursConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs_f64(self.check_interval_secs.max(0.0))
    }

    /// The configured window, or `None` if a field is out of range.
    pub fn hours(&self) -> Option<OperatingHours> {
        OperatingHours::new(
            self.open_hour,
            self.open_minute,
            self.close_hour,
            self.close_minute,
        )
    }
}

/// Opening time (inclusive) and closing time (exclusive).
///
/// A window whose close precedes its open crosses midnight; identical open
/// and close times mean the kiosk never closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    open: NaiveTime,
    close: NaiveTime,
}

impl OperatingHours {
    pub fn new(open_hour: u32, open_minute: u32, close_hour: u32, close_minute: u32) -> Option<Self> {
        Some(Self {
            open: NaiveTime::from_hms_opt(open_hour, open_minute, 0)?,
            close: NaiveTime::from_hms_opt(close_hour, close_minute, 0)?,
        })
    }

    pub fn always_open() -> Self {
        Self {
            open: NaiveTime::MIN,
            close: NaiveTime::MIN,
        }
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// Whether `time` falls inside the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.open == self.close {
            true
        } else if self.open < self.close {
            time >= self.open && time < self.close
        } else {
            time >= self.open || time < self.close
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_same_day_window() {
        let hours = OperatingHours::new(10, 0, 18, 30).unwrap();
        assert!(!hours.contains(at(9, 59)));
        assert!(hours.contains(at(10, 0)));
        assert!(hours.contains(at(18, 29)));
        assert!(!hours.contains(at(18, 30)));
    }

    #[test]
    fn test_window_crossing_midnight() {
        // Default kiosk hours: 06:00 until 00:30
        let hours = OperatingHoursConfig::default().hours().unwrap();
        assert!(hours.contains(at(6, 0)));
        assert!(hours.contains(at(23, 59)));
        assert!(hours.contains(at(0, 29)));
        assert!(!hours.contains(at(0, 30)));
        assert!(!hours.contains(at(5, 59)));
    }

    #[test]
    fn test_equal_open_and_close_is_always_open() {
        let hours = OperatingHours::new(8, 0, 8, 0).unwrap();
        assert!(hours.contains(at(3, 0)));
        assert!(hours.contains(at(8, 0)));
        assert!(OperatingHours::always_open().contains(at(23, 59)));
    }

    #[test]
    fn test_out_of_range_fields() {
        assert!(OperatingHours::new(24, 0, 1, 0).is_none());
        assert!(OperatingHours::new(1, 60, 2, 0).is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config: OperatingHoursConfig = toml::from_str("closed_screen = \"worktime\"").unwrap();
        assert_eq!(config.open_hour, 6);
        assert_eq!(config.close_minute, 30);
        assert_eq!(config.check_interval(), Duration::from_secs(100));
        assert_eq!(config.closed_screen, "worktime");
    }
}
