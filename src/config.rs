use chrono_tz::Tz;
use tracing::warn;

/// Site-level settings the view depends on.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Activity completion tracking is enabled site-wide.
    pub enable_completion: bool,
    /// Conditional availability (restrict access) is enabled site-wide.
    pub enable_availability: bool,
    /// Timezone used for dates when the user has none of their own.
    pub timezone: Tz,
}

impl SiteConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enable_completion = read_flag(&lookup, "REENGAGEMENT_ENABLE_COMPLETION");
        let enable_availability = read_flag(&lookup, "REENGAGEMENT_ENABLE_AVAILABILITY");
        let timezone = match lookup("REENGAGEMENT_TIMEZONE") {
            Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
                warn!(
                    "The given REENGAGEMENT_TIMEZONE: {} is not a known timezone, falling back to UTC.",
                    name
                );
                Tz::UTC
            }),
            None => Tz::UTC,
        };

        Self {
            enable_completion,
            enable_availability,
            timezone,
        }
    }

    pub fn features_enabled(&self) -> bool {
        self.enable_completion && self.enable_availability
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            enable_completion: true,
            enable_availability: true,
            timezone: Tz::UTC,
        }
    }
}

fn read_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    let Some(value) = lookup(key) else {
        return true;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            warn!("The given {}: {} is not a boolean, treating it as enabled.", key, other);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> SiteConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SiteConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_enable_everything_in_utc() {
        let config = config_from(&[]);
        assert!(config.features_enabled());
        assert_eq!(config.timezone, Tz::UTC);
    }

    #[test]
    fn disabling_either_feature_disables_view() {
        let config = config_from(&[("REENGAGEMENT_ENABLE_AVAILABILITY", "0")]);
        assert!(config.enable_completion);
        assert!(!config.features_enabled());

        let config = config_from(&[("REENGAGEMENT_ENABLE_COMPLETION", "false")]);
        assert!(!config.features_enabled());
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("REENGAGEMENT_ENABLE_COMPLETION", "maybe"),
            ("REENGAGEMENT_TIMEZONE", "Mars/Olympus"),
        ]);
        assert!(config.enable_completion);
        assert_eq!(config.timezone, Tz::UTC);
    }

    #[test]
    fn timezone_is_parsed() {
        let config = config_from(&[("REENGAGEMENT_TIMEZONE", "Pacific/Auckland")]);
        assert_eq!(config.timezone, Tz::Pacific__Auckland);
    }
}
