use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub admin_token: String,
    pub razorpay: RazorpayConfig,
    pub online_discount_percent: u8,
    pub otp: OtpConfig,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub code_ttl: Duration,
    pub resend_cooldown: Duration,
    pub max_attempts: u32,
    pub verification_ttl: Duration,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_ttl: Duration::from_secs(300),
            resend_cooldown: Duration::from_secs(30),
            max_attempts: 5,
            verification_ttl: Duration::from_secs(1800),
        }
    }
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let online_discount_percent: u8 = try_load("ONLINE_DISCOUNT_PERCENT", "15")?;
        if online_discount_percent > 100 {
            return Err(anyhow!("ONLINE_DISCOUNT_PERCENT must be between 0 and 100"));
        }
        let admin_token = var("ADMIN_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .context("ADMIN_TOKEN must be set")?;

        Ok(Self {
            port: try_load("PORT", "8083")?,
            database_url: var("DATABASE_URL"),
            nats_url: var("NATS_URL"),
            admin_token,
            razorpay: RazorpayConfig {
                key_id: var("RAZORPAY_KEY_ID").unwrap_or_default(),
                key_secret: var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
                webhook_secret: var("RAZORPAY_WEBHOOK_SECRET"),
            },
            online_discount_percent,
            otp: OtpConfig {
                code_ttl: Duration::from_secs(try_load("OTP_TTL_SECS", "300")?),
                resend_cooldown: Duration::from_secs(try_load("OTP_RESEND_COOLDOWN_SECS", "30")?),
                max_attempts: try_load("OTP_MAX_ATTEMPTS", "5")?,
                verification_ttl: Duration::from_secs(try_load("VERIFICATION_TTL_SECS", "1800")?),
            },
            cors_origins: var("CORS_ORIGINS").map(|v| parse_list(&v)).unwrap_or_default(),
        })
    }

    /// Settings for tests and local runs without an environment.
    pub fn for_tests(admin_token: &str) -> Self {
        Self {
            port: 0,
            database_url: None,
            nats_url: None,
            admin_token: admin_token.to_string(),
            razorpay: RazorpayConfig { key_id: "rzp_test_key".into(), key_secret: "rzp_test_secret".into(), webhook_secret: Some("whsec_test".into()) },
            online_discount_percent: 15,
            otp: OtpConfig::default(),
            cors_origins: vec![],
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("invalid {key}: {e}")
    })
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}
