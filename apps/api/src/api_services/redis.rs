use geosession_core::AppError;
use geosession_infrastructure::RedisSessionStorage;
use tracing::info;

/// Opens a Redis client and scopes every identity's sorted set under `key_prefix`.
pub fn build_redis_storage(
    redis_url: &str,
    key_prefix: &str,
) -> Result<RedisSessionStorage, AppError> {
    let key_prefix = key_prefix.trim_end_matches(':');
    if key_prefix.is_empty() || key_prefix.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(format!(
            "SESSION_REDIS_KEY_PREFIX '{key_prefix}' must be non-empty and contain no whitespace"
        )));
    }

    let client = redis::Client::open(redis_url)
        .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;

    info!(backend = "redis", key_prefix, "session storage configured");
    Ok(RedisSessionStorage::new(client, key_prefix))
}

#[cfg(test)]
mod tests {
    use geosession_core::AppError;

    use super::build_redis_storage;

    #[test]
    fn trailing_separator_is_not_doubled() {
        assert!(build_redis_storage("redis://127.0.0.1:6379", "geosession:sessions:").is_ok());
    }

    #[test]
    fn blank_or_spaced_prefix_is_rejected() {
        for prefix in [":", "geo session"] {
            assert!(matches!(
                build_redis_storage("redis://127.0.0.1:6379", prefix),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(matches!(
            build_redis_storage("not a url", "geosession:sessions"),
            Err(AppError::Validation(_))
        ));
    }
}
