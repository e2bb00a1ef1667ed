use crate::protocol::{DEFAULT_CONTROL_PORT, DEFAULT_PROJECTION_SCALE};

/// Tunables for a [`DeviceSession`](crate::DeviceSession).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Local UDP port the driver binds when creating its interface.
    pub control_port: u16,
    /// Point-cloud projection scale; see [`depth::point_cloud`](crate::depth::point_cloud).
    pub projection_scale: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            control_port: DEFAULT_CONTROL_PORT,
            projection_scale: DEFAULT_PROJECTION_SCALE,
        }
    }
}

impl SessionConfig {
    /// Defaults, overridden by `ILIDAR_CONTROL_PORT` and
    /// `ILIDAR_PROJECTION_SCALE` when set to parseable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            control_port: read_env_u16("ILIDAR_CONTROL_PORT", defaults.control_port),
            projection_scale: read_env_scale("ILIDAR_PROJECTION_SCALE", defaults.projection_scale),
        };
        log::debug!("Session config: {:?}", config);
        config
    }
}

fn read_env_u16(name: &str, default: u16) -> u16 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u16>().ok())
        .filter(|&port| port != 0)
        .unwrap_or(default)
}

fn read_env_scale(name: &str, default: f64) -> f64 {
    match std::env::var(name) {
        Ok(v) => match v.trim().parse::<f64>() {
            Ok(scale) if scale.is_finite() && scale > 0.0 => scale,
            _ => {
                log::warn!("Ignoring {}='{}', using {}", name, v, default);
                default
            }
        },
        Err(_) => default,
    }
}
