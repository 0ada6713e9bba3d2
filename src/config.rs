//! Layered configuration.
//!
//! Sources, highest priority first:
//! 1. `FLIGHTDESK_*` environment variables, `__` separating sections
//!    (`FLIGHTDESK_BILLING__DEFAULT_TAX_RATE=0.15`)
//! 2. `flightdesk.toml` in the working directory
//! 3. Built-in defaults

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DeskError;

const CONFIG_FILE: &str = "flightdesk.toml";
const ENV_PREFIX: &str = "FLIGHTDESK_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub basic: BasicConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub bookings: BookingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:flightdesk.sqlite".to_string(),
            loglevel: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Used when no row in `tax_rates` is flagged as default.
    pub default_tax_rate: Decimal,
    pub payment_terms_days: i64,
    pub invoice_prefix: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_tax_rate: Decimal::new(15, 2),
            payment_terms_days: 14,
            invoice_prefix: "INV".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub due_soon_hours: Decimal,
    pub due_soon_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            due_soon_hours: Decimal::from(10),
            due_soon_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Solo bookings need an approved flight authorization before checkout.
    pub require_solo_authorization: bool,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            require_solo_authorization: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, DeskError> {
        Ok(Self::figment().extract()?)
    }

    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if Path::new(CONFIG_FILE).exists() {
            figment = figment.merge(Toml::file(CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_nested_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FLIGHTDESK_BILLING__PAYMENT_TERMS_DAYS", "30");
            jail.set_env("FLIGHTDESK_BASIC__LOGLEVEL", "debug");
            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.billing.payment_terms_days, 30);
            assert_eq!(cfg.basic.loglevel, "debug");
            assert_eq!(cfg.billing.invoice_prefix, "INV");
            Ok(())
        });
    }

    #[test]
    fn toml_file_is_merged_below_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [maintenance]
                due_soon_hours = "5"
                due_soon_days = 7
                "#,
            )?;
            jail.set_env("FLIGHTDESK_MAINTENANCE__DUE_SOON_DAYS", "14");
            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.maintenance.due_soon_hours, Decimal::from(5));
            assert_eq!(cfg.maintenance.due_soon_days, 14);
            Ok(())
        });
    }
}
