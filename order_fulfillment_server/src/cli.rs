use std::{env, env::VarError};

const HELP: &str = include_str!("./cli-help.txt");

/// Settings that are printed as-is.
const PLAIN_ENVS: [&str; 15] = [
    "RUST_LOG",
    "OFE_HOST",
    "OFE_PORT",
    "OFE_DATABASE_URL",
    "OFE_MAX_DB_CONNECTIONS",
    "OFE_LINE_CEILING",
    "OFE_ORDER_CEILING",
    "OFE_ENFORCE_STOCK",
    "OFE_PENDING_ORDER_TIMEOUT",
    "OFE_IDEMPOTENCY_TTL",
    "OFE_MAINTENANCE_INTERVAL",
    "OFE_WEBHOOK_HMAC_CHECKS",
    "OFE_PICKUP_CODE_MAX_AGE",
    "OFE_USE_X_FORWARDED_FOR",
    "OFE_USE_FORWARDED",
];

/// Settings whose values are never printed. Only whether they are set is shown.
const SECRET_ENVS: [&str; 2] = ["OFE_WEBHOOK_HMAC_SECRET", "OFE_PICKUP_CODE_SECRET"];

/// The server takes no arguments. If any are given, print the help text and the current settings instead of
/// starting. Returns true in that case.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        println!("\n{HELP}\n");
        print_settings();
    }
    has_cli_args
}

fn print_settings() {
    println!("Current environment values:");
    for name in PLAIN_ENVS {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    }
    for name in SECRET_ENVS {
        println!("  {name:<35} {:<15}", describe_secret(env::var(name)));
    }
}

fn describe_secret(value: Result<String, VarError>) -> &'static str {
    match value {
        Ok(s) if s.trim().is_empty() => "Empty",
        Ok(_) => "Set (hidden)",
        Err(VarError::NotPresent) => "Not set",
        Err(VarError::NotUnicode(_)) => "Invalid value",
    }
}
