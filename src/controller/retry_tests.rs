// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{default_backoff, is_retryable_error, retry_api_call, throttle_backoff};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(
            kube::core::Status {
                status: Some(kube::core::response::StatusSummary::Failure),
                message: format!("{reason} error"),
                reason: reason.to_string(),
                code,
                metadata: None,
                details: None,
            }
            .boxed(),
        )
    }

    /// Test that backoff configuration has expected values
    #[test]
    fn test_backoff_configuration() {
        let backoff = default_backoff();

        assert_eq!(backoff.initial_interval, Duration::from_millis(100));
        assert_eq!(backoff.max_interval, Duration::from_secs(30));
        assert_eq!(backoff.max_elapsed_time, Some(Duration::from_secs(300)));

        #[allow(clippy::float_cmp)]
        {
            assert_eq!(backoff.multiplier, 2.0);
            assert_eq!(backoff.randomization_factor, 0.1);
        }
    }

    /// Test that the throttle backoff never gives up and caps at 30 seconds
    #[test]
    fn test_throttle_backoff_caps_without_giving_up() {
        let mut backoff = throttle_backoff();
        assert_eq!(backoff.max_elapsed_time, None);

        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(90) && first <= Duration::from_millis(110));

        for _ in 0..20 {
            assert!(backoff.next_backoff().is_some());
        }
        assert_eq!(backoff.current_interval, Duration::from_secs(30));
    }

    /// Test that reset restores the initial interval
    #[test]
    fn test_reset_restores_initial_interval() {
        let mut backoff = throttle_backoff();
        backoff.next_backoff();
        backoff.next_backoff();
        assert!(backoff.current_interval > backoff.initial_interval);

        backoff.reset();
        assert_eq!(backoff.current_interval, Duration::from_millis(100));
    }

    /// Test that HTTP 429 and 5xx errors are retryable
    #[test]
    fn test_429_and_5xx_are_retryable() {
        assert!(is_retryable_error(&api_error(429, "TooManyRequests")));
        assert!(is_retryable_error(&api_error(500, "InternalServerError")));
        assert!(is_retryable_error(&api_error(503, "ServiceUnavailable")));
        assert!(is_retryable_error(&api_error(599, "ServerError")));
    }

    /// Test that 4xx client errors (except 429) are not retryable
    #[test]
    fn test_4xx_not_retryable() {
        assert!(!is_retryable_error(&api_error(400, "BadRequest")));
        assert!(!is_retryable_error(&api_error(401, "Unauthorized")));
        assert!(!is_retryable_error(&api_error(404, "NotFound")));
    }

    /// Test that service/network errors are retryable
    #[test]
    fn test_service_errors_retryable() {
        let service_error: Box<dyn std::error::Error + Send + Sync> = Box::new(
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection failed"),
        );
        assert!(is_retryable_error(&kube::Error::Service(service_error)));
    }

    /// Test that a permanent error is returned after exactly one attempt
    #[tokio::test]
    async fn test_retry_fails_fast_on_not_found() {
        let attempts = AtomicUsize::new(0);
        let result: anyhow::Result<()> = retry_api_call(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(404, "NotFound")) }
            },
            "get secret",
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<kube::Error>(),
            Some(kube::Error::Api(api_err)) if api_err.code == 404
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    /// Test that a transient error is retried until it succeeds
    #[tokio::test]
    async fn test_retry_recovers_from_transient_error() {
        let attempts = AtomicUsize::new(0);
        let result = retry_api_call(
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(api_error(503, "ServiceUnavailable"))
                    } else {
                        Ok(42)
                    }
                }
            },
            "get secret",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
