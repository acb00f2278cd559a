use super::{types::Config, ConfigError};
use crate::jobs::MIN_JOB_POLL_INTERVAL_SECS;
use crate::maintenance::MIN_POLL_INTERVAL_SECS;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// Validate configuration
/// Currently validates:
/// - Server URL is an http(s) URL
/// - Intervals respect component minimums; timeouts and thresholds are positive
/// - Screen roles and timeouts name non-empty, registered screens
/// - Operating hours are in range
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server
    let url = config.server.url.trim();
    if url.is_empty() {
        return Err(invalid("server.url cannot be empty"));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid(format!(
            "server.url must start with http:// or https://, got '{}'",
            url
        )));
    }

    // Maintenance monitor
    let maintenance = &config.maintenance;
    if !maintenance.poll_interval_secs.is_finite()
        || maintenance.poll_interval_secs < MIN_POLL_INTERVAL_SECS
    {
        return Err(invalid(format!(
            "maintenance.poll_interval_secs must be at least {}",
            MIN_POLL_INTERVAL_SECS
        )));
    }
    if !(1..=60).contains(&maintenance.request_timeout_secs) {
        return Err(invalid("maintenance.request_timeout_secs must be between 1 and 60"));
    }

    // Job pipeline
    let jobs = &config.jobs;
    if !jobs.poll_interval_secs.is_finite() || jobs.poll_interval_secs < MIN_JOB_POLL_INTERVAL_SECS {
        return Err(invalid(format!(
            "jobs.poll_interval_secs must be at least {}",
            MIN_JOB_POLL_INTERVAL_SECS
        )));
    }
    if jobs.request_timeout_secs == 0 {
        return Err(invalid("jobs.request_timeout_secs cannot be 0"));
    }
    if jobs.connectivity_timeout_secs == 0 {
        return Err(invalid("jobs.connectivity_timeout_secs cannot be 0"));
    }
    if jobs.job_error_threshold == 0 {
        return Err(invalid("jobs.job_error_threshold must be at least 1"));
    }
    if jobs.status_bad_request_threshold == 0 {
        return Err(invalid("jobs.status_bad_request_threshold must be at least 1"));
    }

    // Screens
    let screens = &config.screens;
    for (role, name) in screens.roles() {
        if name.trim().is_empty() {
            return Err(invalid(format!("screens.{} cannot be empty", role)));
        }
    }
    if screens.registered.iter().any(|name| name.trim().is_empty()) {
        return Err(invalid("screens.registered contains an empty name"));
    }
    let known = screens.all_screens();
    for (screen, secs) in &screens.timeouts {
        if !known.contains(screen) {
            return Err(invalid(format!(
                "screens.timeouts references unknown screen '{}'",
                screen
            )));
        }
        if !secs.is_finite() || *secs <= 0.0 {
            return Err(invalid(format!(
                "screens.timeouts.{} must be a positive number of seconds",
                screen
            )));
        }
    }

    // Operating hours
    if let Some(hours) = &config.operating_hours {
        if hours.hours().is_none() {
            return Err(invalid(
                "operating_hours: hours must be 0-23 and minutes 0-59",
            ));
        }
        if !hours.check_interval_secs.is_finite() || hours.check_interval_secs <= 0.0 {
            return Err(invalid("operating_hours.check_interval_secs must be positive"));
        }
        if !known.contains(&hours.closed_screen) {
            return Err(invalid(format!(
                "operating_hours.closed_screen '{}' is not a registered screen",
                hours.closed_screen
            )));
        }
    }

    // Runtime
    if config.runtime.tick_ms == 0 {
        return Err(invalid("runtime.tick_ms cannot be 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use crate::schedule::OperatingHoursConfig;

    fn base() -> Config {
        load_config_from_str(
            r#"
[server]
url = "http://jobs.local:8000"

[screens]
registered = ["instructions", "closed"]
"#,
        )
        .unwrap()
    }

    fn assert_invalid(config: &Config) {
        let result = validate_config(config);
        assert!(
            matches!(result, Err(ConfigError::ValidationError(_))),
            "expected validation error, got {:?}",
            result
        );
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&base()).is_ok());
    }

    #[test]
    fn test_validate_server_url() {
        let mut config = base();
        config.server.url = "  ".to_string();
        assert_invalid(&config);

        config.server.url = "jobs.local".to_string();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_intervals() {
        let mut config = base();
        config.maintenance.poll_interval_secs = 0.4;
        assert_invalid(&config);

        let mut config = base();
        config.maintenance.poll_interval_secs = 0.5;
        config.jobs.poll_interval_secs = 0.1;
        assert!(validate_config(&config).is_ok());

        config.jobs.poll_interval_secs = 0.05;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_timeouts_and_thresholds() {
        let mut config = base();
        config.maintenance.request_timeout_secs = 61;
        assert_invalid(&config);

        let mut config = base();
        config.jobs.request_timeout_secs = 0;
        assert_invalid(&config);

        let mut config = base();
        config.jobs.job_error_threshold = 0;
        assert_invalid(&config);

        let mut config = base();
        config.jobs.status_bad_request_threshold = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_screen_timeouts() {
        let mut config = base();
        config.screens.timeouts.insert("instructions".to_string(), 30.0);
        assert!(validate_config(&config).is_ok());

        config.screens.timeouts.insert("lobby".to_string(), 30.0);
        assert_invalid(&config);

        let mut config = base();
        config.screens.timeouts.insert("capture".to_string(), 0.0);
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_operating_hours() {
        let mut config = base();
        config.operating_hours = Some(OperatingHoursConfig::default());
        assert!(validate_config(&config).is_ok());

        config.operating_hours = Some(OperatingHoursConfig {
            close_minute: 75,
            ..Default::default()
        });
        assert_invalid(&config);

        config.operating_hours = Some(OperatingHoursConfig {
            closed_screen: "night".to_string(),
            ..Default::default()
        });
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_tick() {
        let mut config = base();
        config.runtime.tick_ms = 0;
        assert_invalid(&config);
    }
}
