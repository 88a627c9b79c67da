// teamseat-service/src/utils/config.rs
use crate::models::TokenPolicy;
use derive_more::Display;
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Display)]
pub enum ConfigError {
    #[display(fmt = "missing environment variable {}", _0)]
    Missing(String),
    #[display(fmt = "invalid value for {}: {}", _0, _1)]
    Invalid(String, String),
}

impl std::error::Error for ConfigError {}

// How a removed member loses team access on the community platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowngradePolicy {
    // Overwrite every tag with the free-access marker; platform automation finishes the downgrade
    ReplaceWithFreeTier,
    // Drop only the team member tag and leave everything else alone
    RemoveTeamTag,
}

impl FromStr for DowngradePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace-with-free-tier" => Ok(DowngradePolicy::ReplaceWithFreeTier),
            "remove-team-tag" => Ok(DowngradePolicy::RemoveTeamTag),
            other => Err(format!("unknown downgrade policy '{}'", other)),
        }
    }
}

pub fn parse_token_policy(s: &str) -> Result<TokenPolicy, String> {
    match s {
        "single-use" => Ok(TokenPolicy::SingleUse),
        "shareable" => Ok(TokenPolicy::Shareable),
        other => Err(format!("unknown invite token policy '{}'", other)),
    }
}

// Tag ids on the community platform
#[derive(Debug, Clone)]
pub struct TagConfig {
    pub leader: u64,
    pub free_access: u64,
    pub subscription_member: u64,
    pub course_member: u64,
}

#[derive(Debug, Clone)]
pub struct CircleConfig {
    pub api_base: String,
    pub api_token: String,
    pub community_id: u64,
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub webhook_secret: String,
    pub webhook_tolerance_secs: i64,
    pub secret_key: String,
    pub api_base: String,
    pub team_product_id: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub storage_dir: PathBuf,
    pub site_url: String,
    pub http_timeout_secs: u64,
    pub default_seat_limit: u32,
    pub token_policy: TokenPolicy,
    pub downgrade_policy: DowngradePolicy,
    pub tags: TagConfig,
    pub circle: CircleConfig,
    pub billing: BillingConfig,
}

fn required(key: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key.to_string())),
    }
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(key: &str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), raw))
}

impl AppConfig {
    // Load configuration from the environment, reading .env first when present
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_err() {
            info!("No .env file found, using process environment");
        }

        let token_policy = parse_token_policy(&required("INVITE_TOKEN_POLICY")?)
            .map_err(|e| ConfigError::Invalid("INVITE_TOKEN_POLICY".to_string(), e))?;
        let downgrade_policy = optional("DOWNGRADE_POLICY", "replace-with-free-tier")
            .parse::<DowngradePolicy>()
            .map_err(|e| ConfigError::Invalid("DOWNGRADE_POLICY".to_string(), e))?;

        let default_seat_limit: u32 = parsed("TEAM_SEAT_LIMIT", optional("TEAM_SEAT_LIMIT", "5"))?;
        if default_seat_limit == 0 {
            return Err(ConfigError::Invalid(
                "TEAM_SEAT_LIMIT".to_string(),
                "seat limit must be positive".to_string(),
            ));
        }

        let site_url = optional("SITE_URL", "http://localhost:3000");
        if env::var("SITE_URL").is_err() {
            warn!("SITE_URL not set, invite links will point at {}", site_url);
        }

        Ok(Self {
            bind_address: optional("BIND_ADDRESS", "127.0.0.1:9090"),
            storage_dir: PathBuf::from(optional("STORAGE_DIR", "./storage")),
            site_url,
            http_timeout_secs: parsed("HTTP_TIMEOUT_SECS", optional("HTTP_TIMEOUT_SECS", "10"))?,
            default_seat_limit,
            token_policy,
            downgrade_policy,
            tags: TagConfig {
                leader: parsed("TEAMS_LEADER_TAG_ID", optional("TEAMS_LEADER_TAG_ID", "227715"))?,
                free_access: parsed("FREE_ACCESS_TAG_ID", optional("FREE_ACCESS_TAG_ID", "228295"))?,
                subscription_member: parsed(
                    "TEAM_MEMBER_SUBSCRIPTION_TAG_ID",
                    required("TEAM_MEMBER_SUBSCRIPTION_TAG_ID")?,
                )?,
                course_member: parsed(
                    "TEAM_MEMBER_COURSE_TAG_ID",
                    required("TEAM_MEMBER_COURSE_TAG_ID")?,
                )?,
            },
            circle: CircleConfig {
                api_base: optional("CIRCLE_API_BASE", "https://app.circle.so/api/admin/v2"),
                api_token: required("CIRCLE_API_TOKEN")?,
                community_id: parsed("CIRCLE_COMMUNITY_ID", required("CIRCLE_COMMUNITY_ID")?)?,
            },
            billing: BillingConfig {
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
                webhook_tolerance_secs: parsed(
                    "WEBHOOK_TOLERANCE_SECS",
                    optional("WEBHOOK_TOLERANCE_SECS", "300"),
                )?,
                secret_key: required("STRIPE_SECRET_KEY")?,
                api_base: optional("STRIPE_API_BASE", "https://api.stripe.com/v1"),
                team_product_id: required("TEAMS_PRODUCT_ID")?,
            },
        })
    }
}
