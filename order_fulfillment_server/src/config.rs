use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use ofe_common::{
    helpers::{parse_boolean_flag, parse_optional_limit},
    Cents,
    Secret,
};
use order_fulfillment_engine::ofe_api::checkout_objects::{CheckoutPolicy, DEFAULT_PAYMENT_CEILING};

const DEFAULT_OFE_HOST: &str = "127.0.0.1";
const DEFAULT_OFE_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/order_fulfillment.db";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;
const DEFAULT_PENDING_ORDER_TIMEOUT: Duration = Duration::minutes(30);
const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::hours(24);
const DEFAULT_MAINTENANCE_INTERVAL: StdDuration = StdDuration::from_secs(60);
const DEFAULT_PICKUP_CODE_MAX_AGE: Duration = Duration::seconds(600);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// Payment ceilings and stock enforcement for new orders.
    pub checkout_policy: CheckoutPolicy,
    /// Pending orders older than this are cancelled by the maintenance worker. `None` disables the cleanup.
    pub pending_order_timeout: Option<Duration>,
    pub idempotency_ttl: Duration,
    pub maintenance_interval: StdDuration,
    pub webhook: WebhookConfig,
    pub pickup_codes: PickupCodeConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { hmac_secret: Secret::default(), hmac_checks: true }
    }
}

/// Settings for signed pickup codes. Handlers receive this as app data.
#[derive(Clone, Debug)]
pub struct PickupCodeConfig {
    pub secret: Secret<String>,
    pub max_age: Duration,
}

impl Default for PickupCodeConfig {
    fn default() -> Self {
        Self { secret: Secret::default(), max_age: DEFAULT_PICKUP_CODE_MAX_AGE }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OFE_HOST.to_string(),
            port: DEFAULT_OFE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            checkout_policy: CheckoutPolicy::default(),
            pending_order_timeout: Some(DEFAULT_PENDING_ORDER_TIMEOUT),
            idempotency_ttl: DEFAULT_IDEMPOTENCY_TTL,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            webhook: WebhookConfig::default(),
            pickup_codes: PickupCodeConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup. Invalid values are logged and replaced by their defaults.
    pub fn from_lookup<F>(var: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let host = var("OFE_HOST").unwrap_or_else(|| DEFAULT_OFE_HOST.into());
        let port = var("OFE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for OFE_PORT. {e} Using the default, {DEFAULT_OFE_PORT}, instead."
                    );
                    DEFAULT_OFE_PORT
                })
            })
            .unwrap_or(DEFAULT_OFE_PORT);
        let database_url = var("OFE_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ OFE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_db_connections = parse_number(&var, "OFE_MAX_DB_CONNECTIONS", DEFAULT_MAX_DB_CONNECTIONS);
        let checkout_policy = CheckoutPolicy::default()
            .with_line_ceiling(parse_ceiling(&var, "OFE_LINE_CEILING"))
            .with_order_ceiling(parse_ceiling(&var, "OFE_ORDER_CEILING"))
            .with_enforce_stock(parse_boolean_flag(var("OFE_ENFORCE_STOCK"), false));
        if checkout_policy.enforce_stock {
            info!("🪛️ Stock is enforced. Orders that would oversell a product are rejected.");
        }
        let pending_order_timeout = match var("OFE_PENDING_ORDER_TIMEOUT") {
            None => Some(DEFAULT_PENDING_ORDER_TIMEOUT),
            Some(s) => match parse_optional_limit(&s) {
                Ok(Some(mins)) => Some(Duration::minutes(mins)),
                Ok(None) => {
                    info!("🪛️ Stale pending orders will not be cancelled automatically.");
                    None
                },
                Err(e) => {
                    error!("🪛️ Invalid configuration value for OFE_PENDING_ORDER_TIMEOUT. {e}");
                    Some(DEFAULT_PENDING_ORDER_TIMEOUT)
                },
            },
        };
        let idempotency_ttl =
            Duration::hours(parse_number(&var, "OFE_IDEMPOTENCY_TTL", DEFAULT_IDEMPOTENCY_TTL.num_hours()));
        let maintenance_interval = StdDuration::from_secs(parse_number(
            &var,
            "OFE_MAINTENANCE_INTERVAL",
            DEFAULT_MAINTENANCE_INTERVAL.as_secs(),
        ));
        let webhook = WebhookConfig::from_lookup(&var);
        let pickup_codes = PickupCodeConfig::from_lookup(&var);
        let use_x_forwarded_for = parse_boolean_flag(var("OFE_USE_X_FORWARDED_FOR"), false);
        let use_forwarded = parse_boolean_flag(var("OFE_USE_FORWARDED"), false);
        Self {
            host,
            port,
            database_url,
            max_db_connections,
            checkout_policy,
            pending_order_timeout,
            idempotency_ttl,
            maintenance_interval,
            webhook,
            pickup_codes,
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

impl WebhookConfig {
    fn from_lookup<F>(var: &F) -> Self
    where F: Fn(&str) -> Option<String> {
        let hmac_checks = parse_boolean_flag(var("OFE_WEBHOOK_HMAC_CHECKS"), true);
        let hmac_secret = var("OFE_WEBHOOK_HMAC_SECRET").unwrap_or_default();
        if hmac_checks && hmac_secret.is_empty() {
            error!(
                "🪛️ OFE_WEBHOOK_HMAC_SECRET is not set, but webhook signatures are checked. Every payment webhook will \
                 be rejected."
            );
        }
        if !hmac_checks {
            warn!("🚨️ Webhook signature checks are disabled. Anyone can mark orders as paid.");
        }
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

impl PickupCodeConfig {
    fn from_lookup<F>(var: &F) -> Self
    where F: Fn(&str) -> Option<String> {
        let secret = var("OFE_PICKUP_CODE_SECRET").unwrap_or_else(|| {
            warn!("🪛️ OFE_PICKUP_CODE_SECRET is not set. Pickup codes are disabled.");
            String::default()
        });
        let max_age =
            Duration::seconds(parse_number(var, "OFE_PICKUP_CODE_MAX_AGE", DEFAULT_PICKUP_CODE_MAX_AGE.num_seconds()));
        Self { secret: Secret::new(secret), max_age }
    }
}

fn parse_number<F, T>(var: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => default,
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ Invalid configuration value for {name}: {s}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn parse_ceiling<F>(var: &F, name: &str) -> Option<Cents>
where F: Fn(&str) -> Option<String> {
    match var(name) {
        None => Some(Cents::from(DEFAULT_PAYMENT_CEILING)),
        Some(s) => match parse_optional_limit(&s) {
            Ok(limit) => {
                if limit.is_none() {
                    info!("🪛️ {name} is disabled.");
                }
                limit.map(Cents::from)
            },
            Err(e) => {
                error!("🪛️ Invalid configuration value for {name}. {e}");
                Some(Cents::from(DEFAULT_PAYMENT_CEILING))
            },
        },
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
