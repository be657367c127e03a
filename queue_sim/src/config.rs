//! Simulation configuration
//!
//! `SimConfig` is what users write (TOML, all fields optional). Calling
//! [`SimConfig::validate`] turns it into a typed [`Scenario`] or fails with
//! a [`ConfigError`] naming the offending option; nothing is simulated from
//! an invalid configuration.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::engine::Model;
use crate::error::ConfigError;
use crate::pool::Discipline;
use crate::process::Process;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub seed: u64,
    pub customer_count: usize,
    /// Before scaling by the number of servers
    pub mean_inter_arrival: f64,
    pub mean_service_time: f64,
    pub replication_count: usize,
    pub server_count: usize,
    pub arrival_distribution: String,
    pub service_distribution: String,
    pub discipline: String,
    /// Worker threads for the replication fan-out; rayon's default when unset
    pub threads: Option<usize>,
    /// Log every arrival, admission and departure
    pub verbose: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            seed: 42,
            customer_count: 500,
            mean_inter_arrival: 2.0,
            mean_service_time: 2.0,
            replication_count: 100,
            server_count: 1,
            arrival_distribution: "M".to_string(),
            service_distribution: "M".to_string(),
            discipline: "FIFO".to_string(),
            threads: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceKind {
    Exponential,
    Deterministic,
    Hyperexponential,
}

fn service_kind(value: &str) -> Option<ServiceKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "m" | "exponential" => Some(ServiceKind::Exponential),
        "d" | "deterministic" => Some(ServiceKind::Deterministic),
        "h" | "h2" | "hyperexponential" => Some(ServiceKind::Hyperexponential),
        _ => None,
    }
}

fn positive_mean(option: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidMean { option, value })
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<SimConfig, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<SimConfig, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        SimConfig::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<Scenario, ConfigError> {
        let discipline: Discipline = self.discipline.parse()?;

        match service_kind(&self.arrival_distribution) {
            Some(ServiceKind::Exponential) => {}
            _ => {
                return Err(ConfigError::Unsupported {
                    option: "arrival_distribution",
                    value: self.arrival_distribution.clone(),
                });
            }
        }
        let kind =
            service_kind(&self.service_distribution).ok_or_else(|| ConfigError::Unsupported {
                option: "service_distribution",
                value: self.service_distribution.clone(),
            })?;

        if self.server_count == 0 {
            return Err(ConfigError::NoServers);
        }
        if self.threads == Some(0) {
            return Err(ConfigError::NoThreads);
        }

        let mean_inter_arrival = positive_mean("mean_inter_arrival", self.mean_inter_arrival)?;
        // scaled so the offered load stays the same as servers are added
        let scaled = mean_inter_arrival / self.server_count as f64;
        let inter_arrival = Process::exponential(scaled).map_err(|_| ConfigError::InvalidMean {
            option: "mean_inter_arrival",
            value: self.mean_inter_arrival,
        })?;

        let service = match kind {
            ServiceKind::Exponential => {
                Process::exponential(positive_mean("mean_service_time", self.mean_service_time)?)
            }
            ServiceKind::Deterministic => {
                Process::deterministic(positive_mean("mean_service_time", self.mean_service_time)?)
            }
            ServiceKind::Hyperexponential => Process::hyperexponential(),
        }
        .map_err(|_| ConfigError::InvalidMean {
            option: "mean_service_time",
            value: self.mean_service_time,
        })?;

        Ok(Scenario {
            model: Model {
                customers: self.customer_count,
                servers: self.server_count,
                discipline,
                inter_arrival,
                service,
            },
            seed: self.seed,
            replications: self.replication_count,
            threads: self.threads,
            verbose: self.verbose,
        })
    }
}

/// A validated configuration, ready to run
#[derive(Debug, Clone)]
pub struct Scenario {
    pub model: Model,
    pub seed: u64,
    pub replications: usize,
    pub threads: Option<usize>,
    pub verbose: bool,
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl Scenario {
    /// Mean gap between arrivals after scaling by server count
    pub fn effective_inter_arrival(&self) -> f64 {
        self.model.inter_arrival.mean()
    }

    /// Offered load per server
    pub fn load(&self) -> f64 {
        self.model.service.mean()
            / (self.effective_inter_arrival() * self.model.servers as f64)
    }

    /// Seed of the random stream for replication `index`
    pub fn replication_seed(&self, index: usize) -> u64 {
        splitmix64(self.seed ^ splitmix64(index as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_validate() {
        let scenario = SimConfig::default().validate().unwrap();
        assert_eq!(scenario.model.customers, 500);
        assert_eq!(scenario.model.servers, 1);
        assert_eq!(scenario.model.discipline, Discipline::Fifo);
        assert_eq!(scenario.replications, 100);
        assert_eq!(scenario.model.kendall(), "M/M/1 FIFO");
        assert_relative_eq!(scenario.load(), 1.0);
    }

    #[test]
    fn inter_arrival_scaled_by_servers() {
        let config = SimConfig {
            server_count: 4,
            mean_inter_arrival: 2.0,
            ..SimConfig::default()
        };
        let scenario = config.validate().unwrap();
        assert_relative_eq!(scenario.effective_inter_arrival(), 0.5);
        assert_relative_eq!(scenario.load(), 1.0);
    }

    #[test]
    fn long_names_and_letters_accepted() {
        for (value, kendall) in [
            ("deterministic", "D"),
            ("D", "D"),
            ("Hyperexponential", "H2"),
            ("h", "H2"),
            ("exponential", "M"),
        ] {
            let config = SimConfig {
                service_distribution: value.to_string(),
                ..SimConfig::default()
            };
            assert_eq!(config.validate().unwrap().model.service.kendall(), kendall);
        }
    }

    #[test]
    fn deterministic_service_uses_configured_mean() {
        let config = SimConfig {
            service_distribution: "D".to_string(),
            mean_service_time: 3.5,
            ..SimConfig::default()
        };
        assert_eq!(config.validate().unwrap().model.service.mean(), 3.5);
    }

    #[test]
    fn unsupported_options_named_in_error() {
        let config = SimConfig {
            discipline: "LIFO".to_string(),
            ..SimConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "unsupported discipline: 'LIFO'");

        let config = SimConfig {
            arrival_distribution: "D".to_string(),
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Unsupported {
                option: "arrival_distribution",
                ..
            })
        ));

        let config = SimConfig {
            service_distribution: "G".to_string(),
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Unsupported {
                option: "service_distribution",
                ..
            })
        ));
    }

    #[test]
    fn zero_servers_rejected() {
        let config = SimConfig {
            server_count: 0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoServers)));
    }

    #[test]
    fn bad_means_and_threads_rejected() {
        let config = SimConfig {
            mean_inter_arrival: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMean {
                option: "mean_inter_arrival",
                ..
            })
        ));

        let config = SimConfig {
            mean_service_time: -1.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMean {
                option: "mean_service_time",
                ..
            })
        ));

        let config = SimConfig {
            threads: Some(0),
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoThreads)));
    }

    #[test]
    fn hyperexponential_ignores_mean_service_time() {
        let config = SimConfig {
            service_distribution: "H".to_string(),
            mean_service_time: 7.0,
            ..SimConfig::default()
        };
        assert_relative_eq!(config.validate().unwrap().model.service.mean(), 2.0);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            seed = 7
            server_count = 2
            discipline = "SJF"
            service_distribution = "hyperexponential"
            threads = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.server_count, 2);
        assert_eq!(config.customer_count, 500);
        assert_eq!(config.threads, Some(4));
        let scenario = config.validate().unwrap();
        assert_eq!(scenario.model.kendall(), "M/H2/2 SJF");
    }

    #[test]
    fn shipped_experiments_validate() {
        for (path, kendall) in [
            ("experiments/mm2_sjf.toml", "M/M/2 SJF"),
            ("experiments/mh1_fifo.toml", "M/H2/1 FIFO"),
        ] {
            let full = Path::new(env!("CARGO_MANIFEST_DIR")).join(path);
            let scenario = SimConfig::from_path(full).unwrap().validate().unwrap();
            assert_eq!(scenario.model.kendall(), kendall);
        }
    }

    #[test]
    fn toml_unknown_field_rejected() {
        let err = SimConfig::from_toml_str("capacity = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimConfig::from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn replication_seeds_distinct_and_stable() {
        let scenario = SimConfig::default().validate().unwrap();
        let seeds: Vec<u64> = (0..100).map(|i| scenario.replication_seed(i)).collect();
        let mut unique = seeds.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), seeds.len());
        assert_eq!(scenario.replication_seed(3), seeds[3]);

        let other = SimConfig {
            seed: 43,
            ..SimConfig::default()
        }
        .validate()
        .unwrap();
        assert_ne!(other.replication_seed(0), scenario.replication_seed(1));
    }
}
