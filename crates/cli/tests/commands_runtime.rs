use std::env;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use carepath_cli::commands::{check, config, estimate, migrate, steps, transitions};
use rust_decimal::Decimal;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("CAREPATH_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("CAREPATH_DATABASE_URL", "postgres://localhost/carepath")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn check_exits_zero_for_allowed_transition() {
    with_env(&[], || {
        let result = check::run("booking", "pending", "confirmed");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["allowed"], true);
        assert_eq!(payload["data"]["reason"], "allowed");
    });
}

#[test]
fn check_exits_one_for_denied_transition() {
    with_env(&[], || {
        let result = check::run("appointment", "completed", "scheduled");
        assert_eq!(result.exit_code, 1, "terminal status should deny the move");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["allowed"], false);
        assert_eq!(payload["data"]["reason"], "terminal_state");
    });
}

#[test]
fn check_rejects_unknown_status() {
    with_env(&[], || {
        let result = check::run("payment", "pending", "teleported");
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
        assert!(payload["message"].as_str().unwrap_or_default().contains("teleported"));
    });
}

#[test]
fn transitions_lists_targets_from_one_status() {
    with_env(&[], || {
        let result = transitions::run("payment", Some("failed"));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["terminal"], false);
        assert_eq!(payload["data"]["allowed"], serde_json::json!(["pending"]));
    });
}

#[test]
fn transitions_uses_configured_override_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("transitions.toml");
    std::fs::write(
        &path,
        r#"
[prescription]
initial = "pending"

[prescription.transitions]
pending = ["active", "cancelled"]
active = ["completed", "cancelled", "expired"]
completed = []
cancelled = []
expired = []

[prescription.reactivations]
expired = ["active"]
"#,
    )
    .expect("write override");
    let path = path.display().to_string();

    with_env(&[("CAREPATH_LIFECYCLE_TRANSITIONS_PATH", path.as_str())], || {
        let result = transitions::run("prescription", None);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["reactivations"]["expired"], serde_json::json!(["active"]));
    });
}

#[test]
fn steps_describes_step_by_number() {
    with_env(&[], || {
        let result = steps::run(Some("10"));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["current"]["slug"], "confirmation");
        assert_eq!(payload["data"]["next"], "expert_call_scheduling");
        assert_eq!(payload["data"]["previous"], "insurance");
    });
}

#[test]
fn steps_lists_all_eleven_steps() {
    with_env(&[], || {
        let result = steps::run(None);
        let payload = parse_payload(&result.output);

        let listed = payload["data"].as_array().map(Vec::len).unwrap_or_default();
        assert_eq!(listed, 11);
    });
}

#[test]
fn estimate_reports_final_estimate() {
    with_env(&[], || {
        let add_ons = vec!["travel:500".to_string(), "accommodation:300".to_string()];
        let result = estimate::run("10000", &add_ons, Some("10"));
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        let final_estimate = payload["data"]["final_estimate"].as_str().unwrap_or_default();
        assert_eq!(Decimal::from_str(final_estimate).ok(), Some(Decimal::from(11_880)));
        assert_eq!(payload["data"]["currency"], "USD");
    });
}

#[test]
fn estimate_rejects_more_than_twenty_add_ons() {
    with_env(&[], || {
        let add_ons: Vec<String> = (0..21).map(|_| "service:10".to_string()).collect();
        let result = estimate::run("10000", &add_ons, None);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "add_on_limit");
    });
}

#[test]
fn estimate_reports_overflow_as_invalid_input() {
    with_env(&[], || {
        let result = estimate::run("79228162514264337593543950335", &[], Some("10"));
        assert_eq!(result.exit_code, 2, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
        assert!(payload["message"].as_str().unwrap_or_default().contains("amount overflow"));
    });
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("CAREPATH_ESTIMATION_CURRENCY", "EUR"), ("CAREPATH_LOG_LEVEL", "debug")], || {
        let output = config::run();

        assert!(output
            .contains("- estimation.currency = EUR (source: env (CAREPATH_ESTIMATION_CURRENCY))"));
        assert!(output.contains("- logging.level = debug (source: env (CAREPATH_LOG_LEVEL))"));
        assert!(output.contains("- estimation.max_add_ons = 20 (source: default)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CAREPATH_DATABASE_URL",
        "CAREPATH_DATABASE_MAX_CONNECTIONS",
        "CAREPATH_DATABASE_TIMEOUT_SECS",
        "CAREPATH_ESTIMATION_CURRENCY",
        "CAREPATH_ESTIMATION_MIN_RANGE",
        "CAREPATH_ESTIMATION_MAX_RANGE",
        "CAREPATH_ESTIMATION_MAX_ADD_ONS",
        "CAREPATH_ESTIMATION_DEFAULT_TAX_PERCENT",
        "CAREPATH_LIFECYCLE_TRANSITIONS_PATH",
        "CAREPATH_LIFECYCLE_MAX_TRANSITION_ATTEMPTS",
        "CAREPATH_NOTIFICATIONS_QUIET_HOURS_ENABLED",
        "CAREPATH_NOTIFICATIONS_QUIET_HOURS_START",
        "CAREPATH_NOTIFICATIONS_QUIET_HOURS_END",
        "CAREPATH_NOTIFICATIONS_URGENT_ALWAYS_ENABLED",
        "CAREPATH_LOGGING_LEVEL",
        "CAREPATH_LOGGING_FORMAT",
        "CAREPATH_LOG_LEVEL",
        "CAREPATH_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
