use provider::ProviderSettings;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::path::Path;
use std::time::Duration;
use strategies::StrategySettings;

pub const ENV_RPC_URL: &str = "PUMP_TRADER_RPC_URL";
pub const ENV_HELIUS_API_KEY: &str = "HELIUS_API_KEY";
pub const ENV_KEYPAIR: &str = "PUMP_TRADER_KEYPAIR";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TraderConfig {
    pub rpc_url: String,
    pub keypair_path: String,
    /// `processed`, `confirmed` or `finalized`.
    pub commitment: String,
    pub compute_unit_limit: u32,
    /// Micro-lamports per compute unit for bonding-curve trades.
    pub compute_unit_price: u64,
    /// Total priority fee in SOL for PumpSwap trades.
    pub pump_swap_fee_sol: Decimal,
    pub confirm_max_retries: u32,
    pub confirm_interval_ms: u64,
}

impl Default for TraderConfig {
    fn default() -> Self {
        let strategy = StrategySettings::default();
        let provider = ProviderSettings::default();
        TraderConfig {
            rpc_url: provider.rpc_url,
            keypair_path: "~/.config/solana/id.json".to_string(),
            commitment: "confirmed".to_string(),
            compute_unit_limit: strategy.compute_unit_limit,
            compute_unit_price: strategy.compute_unit_price,
            pump_swap_fee_sol: strategy.pump_swap_fee_sol,
            confirm_max_retries: provider.confirm_max_retries,
            confirm_interval_ms: provider.confirm_interval.as_millis() as u64,
        }
    }
}

impl TraderConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Applies overrides from the process environment, after loading `.env`.
    pub fn apply_env(&mut self) {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// An explicit RPC URL wins over one built from a Helius API key.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty(ENV_RPC_URL) {
            log::debug!("RPC URL taken from {}", ENV_RPC_URL);
            self.rpc_url = url;
        } else if let Some(api_key) = non_empty(ENV_HELIUS_API_KEY) {
            log::debug!("RPC URL built from {}", ENV_HELIUS_API_KEY);
            self.rpc_url = format!("https://mainnet.helius-rpc.com/?api-key={}", api_key.trim());
        }
        if let Some(path) = non_empty(ENV_KEYPAIR) {
            self.keypair_path = path;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("RPC URL cannot be empty".to_string()));
        }
        if self.keypair_path.trim().is_empty() {
            return Err(ConfigError::ValidationError("Keypair path cannot be empty".to_string()));
        }
        if self.compute_unit_limit == 0 {
            return Err(ConfigError::ValidationError(
                "Compute unit limit must be greater than 0".to_string(),
            ));
        }
        if self.pump_swap_fee_sol.is_sign_negative() {
            return Err(ConfigError::ValidationError(
                "PumpSwap priority fee cannot be negative".to_string(),
            ));
        }
        if self.confirm_max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "Confirmation retries must be greater than 0".to_string(),
            ));
        }
        self.commitment_config()?;
        Ok(())
    }

    pub fn commitment_config(&self) -> Result<CommitmentConfig, ConfigError> {
        match self.commitment.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown commitment level '{}'",
                other
            ))),
        }
    }

    /// Expands a leading `~/` against `$HOME`.
    pub fn keypair_file(&self) -> String {
        match (self.keypair_path.strip_prefix("~/"), std::env::var("HOME")) {
            (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
            _ => self.keypair_path.clone(),
        }
    }

    pub fn provider_settings(&self) -> Result<ProviderSettings, ConfigError> {
        Ok(ProviderSettings {
            rpc_url: self.rpc_url.clone(),
            commitment: self.commitment_config()?,
            confirm_max_retries: self.confirm_max_retries,
            confirm_interval: Duration::from_millis(self.confirm_interval_ms),
        })
    }

    pub fn strategy_settings(&self) -> StrategySettings {
        StrategySettings {
            compute_unit_limit: self.compute_unit_limit,
            compute_unit_price: self.compute_unit_price,
            pump_swap_fee_sol: self.pump_swap_fee_sol,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn create_test_config() -> TraderConfig {
        TraderConfig {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            keypair_path: "/tmp/trader.json".to_string(),
            commitment: "finalized".to_string(),
            compute_unit_limit: 200_000,
            compute_unit_price: 250_000,
            pump_swap_fee_sol: dec!(0.001),
            confirm_max_retries: 5,
            confirm_interval_ms: 1_500,
        }
    }

    #[test]
    fn test_config_save_and_load() {
        let config = create_test_config();
        let temp_file = NamedTempFile::new().unwrap();

        config.save(temp_file.path()).unwrap();
        let loaded = TraderConfig::load(temp_file.path()).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "rpc_url: http://localhost:8899\npump_swap_fee_sol: 0.002\n")
            .unwrap();

        let loaded = TraderConfig::load(temp_file.path()).unwrap();
        assert_eq!(loaded.rpc_url, "http://localhost:8899");
        assert_eq!(loaded.pump_swap_fee_sol, dec!(0.002));
        assert_eq!(loaded.compute_unit_limit, TraderConfig::default().compute_unit_limit);
        loaded.validate().unwrap();
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            TraderConfig::load("/nonexistent/trader.yml"),
            Err(ConfigError::IoError(_))
        ));

        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "compute_unit_limit: [not, a, number]\n").unwrap();
        assert!(matches!(
            TraderConfig::load(temp_file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = create_test_config();
        config.validate().unwrap();

        config.rpc_url = " ".to_string();
        assert!(config.validate().is_err());

        config = create_test_config();
        config.keypair_path.clear();
        assert!(config.validate().is_err());

        config = create_test_config();
        config.compute_unit_limit = 0;
        assert!(config.validate().is_err());

        config = create_test_config();
        config.pump_swap_fee_sol = dec!(-0.1);
        assert!(config.validate().is_err());

        config = create_test_config();
        config.confirm_max_retries = 0;
        assert!(config.validate().is_err());

        config = create_test_config();
        config.commitment = "eventually".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_HELIUS_API_KEY, "abc123"),
            (ENV_KEYPAIR, "/keys/hot.json"),
        ]
        .into_iter()
        .collect();
        let mut config = create_test_config();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.rpc_url, "https://mainnet.helius-rpc.com/?api-key=abc123");
        assert_eq!(config.keypair_path, "/keys/hot.json");

        let vars: HashMap<&str, &str> = [
            (ENV_RPC_URL, "http://127.0.0.1:8899"),
            (ENV_HELIUS_API_KEY, "ignored"),
            (ENV_KEYPAIR, ""),
        ]
        .into_iter()
        .collect();
        let mut config = create_test_config();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.keypair_path, "/tmp/trader.json");
    }

    #[test]
    fn test_derived_settings() {
        let config = create_test_config();
        let provider = config.provider_settings().unwrap();
        assert_eq!(provider.commitment, CommitmentConfig::finalized());
        assert_eq!(provider.confirm_interval, Duration::from_millis(1_500));
        assert_eq!(provider.confirm_max_retries, 5);

        let strategy = config.strategy_settings();
        assert_eq!(strategy.compute_unit_limit, 200_000);
        assert_eq!(strategy.pump_swap_unit_price(), 5_000_000);
    }

    #[test]
    fn test_keypair_file_keeps_absolute_paths() {
        let config = create_test_config();
        assert_eq!(config.keypair_file(), "/tmp/trader.json");
    }
}
