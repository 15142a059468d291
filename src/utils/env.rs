use std::str::FromStr;

/// Prefix that scopes this crate's variables, e.g. `GATEWAY_STRIPE_API_KEY`.
pub const ENV_PREFIX: &str = "GATEWAY_";

/// Read `GATEWAY_{key}`, falling back to plain `{key}` (e.g. `STRIPE_API_KEY`).
///
/// A blank value counts as unset, so an empty `GATEWAY_STRIPE_API_KEY=` in a
/// deployment manifest does not hide a real `STRIPE_API_KEY`.
///
/// ```rust
/// use stripe_gateway::utils::get_env_with_prefix;
///
/// let secret = get_env_with_prefix("STRIPE_WEBHOOK_SECRET");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    read_non_blank(&format!("{ENV_PREFIX}{key}")).or_else(|| read_non_blank(key))
}

/// Like [`get_env_with_prefix`], parsed into `T`. Unparseable values read as unset.
pub fn get_env_parsed<T: FromStr>(key: &str) -> Option<T> {
    get_env_with_prefix(key).and_then(|value| value.trim().parse().ok())
}

fn read_non_blank(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns distinct variable names; the process environment is shared.

    #[test]
    fn test_prefixed_name_wins() {
        unsafe {
            std::env::set_var("GATEWAY_ENV_WINS_KEY", "sk_test_prefixed");
            std::env::set_var("ENV_WINS_KEY", "sk_test_plain");
        }
        assert_eq!(get_env_with_prefix("ENV_WINS_KEY").as_deref(), Some("sk_test_prefixed"));

        unsafe {
            std::env::remove_var("GATEWAY_ENV_WINS_KEY");
        }
        assert_eq!(get_env_with_prefix("ENV_WINS_KEY").as_deref(), Some("sk_test_plain"));

        unsafe {
            std::env::remove_var("ENV_WINS_KEY");
        }
        assert_eq!(get_env_with_prefix("ENV_WINS_KEY"), None);
    }

    #[test]
    fn test_blank_prefixed_value_falls_through() {
        unsafe {
            std::env::set_var("GATEWAY_ENV_BLANK_SECRET", "  ");
            std::env::set_var("ENV_BLANK_SECRET", "whsec_plain");
        }
        assert_eq!(get_env_with_prefix("ENV_BLANK_SECRET").as_deref(), Some("whsec_plain"));
        unsafe {
            std::env::remove_var("GATEWAY_ENV_BLANK_SECRET");
            std::env::remove_var("ENV_BLANK_SECRET");
        }
    }

    #[test]
    fn test_get_env_parsed() {
        unsafe {
            std::env::set_var("GATEWAY_ENV_PARSED_TOLERANCE", " 120 ");
            std::env::set_var("GATEWAY_ENV_PARSED_LIMIT", "lots");
        }
        assert_eq!(get_env_parsed::<u64>("ENV_PARSED_TOLERANCE"), Some(120));
        assert_eq!(get_env_parsed::<u32>("ENV_PARSED_LIMIT"), None);
        assert_eq!(get_env_parsed::<bool>("ENV_PARSED_MISSING"), None);
        unsafe {
            std::env::remove_var("GATEWAY_ENV_PARSED_TOLERANCE");
            std::env::remove_var("GATEWAY_ENV_PARSED_LIMIT");
        }
    }
}
