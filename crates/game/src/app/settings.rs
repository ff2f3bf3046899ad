use std::str::FromStr;

use tracing::warn;

pub const ONLINE_ENV_VAR: &str = "TILEMON_ONLINE";
pub const SEED_ENV_VAR: &str = "TILEMON_SEED";
pub const VOLUME_ENV_VAR: &str = "TILEMON_VOLUME";
pub const TPS_ENV_VAR: &str = "TILEMON_TPS";

const MIN_TPS: u32 = 10;
const MAX_TPS: u32 = 240;

#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    pub online: bool,
    pub seed: Option<u64>,
    pub bgm_volume: f32,
    pub muted: bool,
    pub target_tps: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            online: false,
            seed: None,
            bgm_volume: 0.5,
            muted: false,
            target_tps: 60,
        }
    }
}

impl GameSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`. Values that do not parse are logged
    /// and leave the default in place.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = lookup(ONLINE_ENV_VAR) {
            match parse_flag(&raw) {
                Some(online) => settings.online = online,
                None => warn_invalid(ONLINE_ENV_VAR, &raw),
            }
        }
        if let Some(raw) = lookup(SEED_ENV_VAR) {
            match parse_trimmed::<u64>(&raw) {
                Some(seed) => settings.seed = Some(seed),
                None => warn_invalid(SEED_ENV_VAR, &raw),
            }
        }
        if let Some(raw) = lookup(VOLUME_ENV_VAR) {
            match parse_trimmed::<f32>(&raw).filter(|volume| (0.0..=1.0).contains(volume)) {
                Some(volume) => settings.bgm_volume = volume,
                None => warn_invalid(VOLUME_ENV_VAR, &raw),
            }
        }
        if let Some(raw) = lookup(TPS_ENV_VAR) {
            match parse_trimmed::<u32>(&raw).filter(|tps| (MIN_TPS..=MAX_TPS).contains(tps)) {
                Some(tps) => settings.target_tps = tps,
                None => warn_invalid(TPS_ENV_VAR, &raw),
            }
        }

        settings
    }

    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.bgm_volume
        }
    }
}

fn parse_trimmed<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn warn_invalid(var: &'static str, raw: &str) {
    warn!(var, value = raw, "invalid_setting_ignored");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> GameSettings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        GameSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn unset_environment_yields_defaults() {
        assert_eq!(settings_from(&[]), GameSettings::default());
    }

    #[test]
    fn valid_overrides_are_applied() {
        let settings = settings_from(&[
            (ONLINE_ENV_VAR, "on"),
            (SEED_ENV_VAR, " 42 "),
            (VOLUME_ENV_VAR, "0.25"),
            (TPS_ENV_VAR, "30"),
        ]);
        assert!(settings.online);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.bgm_volume, 0.25);
        assert_eq!(settings.target_tps, 30);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let settings = settings_from(&[
            (ONLINE_ENV_VAR, "maybe"),
            (SEED_ENV_VAR, "-1"),
            (VOLUME_ENV_VAR, "3"),
            (TPS_ENV_VAR, "0"),
        ]);
        assert_eq!(settings, GameSettings::default());
    }

    #[test]
    fn muted_volume_is_zero() {
        let settings = GameSettings {
            muted: true,
            ..GameSettings::default()
        };
        assert_eq!(settings.effective_volume(), 0.0);
    }
}
