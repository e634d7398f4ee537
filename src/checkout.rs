//! Hosted checkout session management.
//!
//! Handles creating hosted checkout sessions for online dues payment.
//! The member is redirected to the payment processor's page and returns
//! to the club site afterwards; settlement arrives as a confirmation
//! event handled by [`crate::payment::PaymentManager`].

use crate::error::DuesError;
use async_trait::async_trait;
use url::Url;

/// Checkout session response.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Processor-side session ID.
    pub id: String,
    /// URL to redirect the member to.
    pub url: String,
}

/// Request to create a hosted checkout session for dues.
#[derive(Debug, Clone)]
pub struct CreateDuesCheckoutRequest {
    /// The member paying dues.
    pub member_id: String,
    /// The dues cycle being paid.
    pub cycle_id: String,
    /// Amount due, in minor currency units.
    pub amount: i64,
    /// Line item description shown on the checkout page.
    pub description: String,
    /// URL to redirect to on success.
    pub success_url: String,
    /// URL to redirect to on cancel.
    pub cancel_url: String,
}

/// Trait for hosted checkout operations.
#[async_trait]
pub trait CheckoutClient: Send + Sync {
    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: CreateDuesCheckoutRequest,
    ) -> Result<CheckoutSession, DuesError>;
}

/// Configuration for checkout sessions.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// URL to redirect to after a successful payment.
    pub success_url: String,
    /// URL to redirect to when checkout is cancelled.
    pub cancel_url: String,
    /// Allowed domains for redirect URLs (empty = allow any HTTPS URL).
    /// This prevents open redirect vulnerabilities.
    pub allowed_redirect_domains: Vec<String>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            success_url: String::new(),
            cancel_url: String::new(),
            allowed_redirect_domains: Vec::new(),
        }
    }
}

impl CheckoutConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the success redirect URL.
    #[must_use]
    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = url.into();
        self
    }

    /// Set the cancel redirect URL.
    #[must_use]
    pub fn cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = url.into();
        self
    }

    /// Set allowed redirect domains.
    ///
    /// Only URLs matching these domains will be accepted for success/cancel URLs.
    /// If empty, any HTTPS URL is allowed (not recommended for production).
    #[must_use]
    pub fn allowed_redirect_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_redirect_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Add a single allowed redirect domain.
    #[must_use]
    pub fn add_allowed_domain(mut self, domain: impl Into<String>) -> Self {
        self.allowed_redirect_domains.push(domain.into());
        self
    }

    /// Validate a redirect URL against the allowed domains.
    ///
    /// Returns an error if:
    /// - The URL is not valid
    /// - The URL is not HTTPS
    /// - The URL's domain is not in the allowed list (if list is non-empty)
    pub fn validate_redirect_url(&self, url: &str) -> Result<(), DuesError> {
        let parsed = Url::parse(url)
            .map_err(|e| DuesError::validation("redirect_url", format!("invalid URL: {}", e)))?;

        // Must be HTTPS
        if parsed.scheme() != "https" {
            return Err(DuesError::validation("redirect_url", "must use HTTPS"));
        }

        // Check domain if allowed list is configured
        if !self.allowed_redirect_domains.is_empty() {
            let host = parsed
                .host_str()
                .ok_or_else(|| DuesError::validation("redirect_url", "must have a host"))?;

            let domain_allowed = self.allowed_redirect_domains.iter().any(|allowed| {
                // Exact match or subdomain match
                host == allowed || host.ends_with(&format!(".{}", allowed))
            });

            if !domain_allowed {
                return Err(DuesError::validation(
                    "redirect_url",
                    format!("domain '{}' is not allowed", host),
                ));
            }
        }

        Ok(())
    }
}

/// Mock checkout client for testing.
#[cfg(any(test, feature = "test-support"))]
pub mod test {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Mock checkout client.
    #[derive(Default)]
    pub struct MockCheckoutClient {
        session_counter: AtomicU64,
        fail_next: std::sync::atomic::AtomicBool,
    }

    impl MockCheckoutClient {
        /// Create a new mock client.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next session creation fail with an upstream error.
        pub fn fail_next(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CheckoutClient for MockCheckoutClient {
        async fn create_checkout_session(
            &self,
            _request: CreateDuesCheckoutRequest,
        ) -> Result<CheckoutSession, DuesError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(DuesError::Checkout {
                    operation: "create_checkout_session".to_string(),
                    message: "mock failure".to_string(),
                });
            }
            let id = format!("cs_test_{}", self.session_counter.fetch_add(1, Ordering::SeqCst));
            Ok(CheckoutSession {
                id: id.clone(),
                url: format!("https://checkout.example.com/c/pay/{}", id),
            })
        }
    }

    impl Clone for MockCheckoutClient {
        fn clone(&self) -> Self {
            // Counters aren't shared across clones, which is fine for tests
            Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::MockCheckoutClient;
    use super::*;

    #[tokio::test]
    async fn test_mock_client_creates_sessions() {
        let client = MockCheckoutClient::new();

        let session = client
            .create_checkout_session(CreateDuesCheckoutRequest {
                member_id: "mem_1".to_string(),
                cycle_id: "cyc_1".to_string(),
                amount: 8500,
                description: "2026 Annual Dues".to_string(),
                success_url: "https://club.example.com/dues/success".to_string(),
                cancel_url: "https://club.example.com/dues".to_string(),
            })
            .await
            .unwrap();

        assert!(session.id.starts_with("cs_test_"));
        assert!(session.url.contains("checkout.example.com"));
    }

    #[test]
    fn test_url_validation_https_required() {
        let config = CheckoutConfig::new();

        assert!(config.validate_redirect_url("https://example.com/success").is_ok());
        assert!(config.validate_redirect_url("http://example.com/success").is_err());
    }

    #[test]
    fn test_url_validation_invalid_url() {
        let config = CheckoutConfig::new();

        assert!(config.validate_redirect_url("not-a-url").is_err());
        assert!(config.validate_redirect_url("").is_err());
    }

    #[test]
    fn test_url_validation_allowed_domains() {
        let config = CheckoutConfig::new().allowed_redirect_domains(["example.com", "app.mysite.com"]);

        // Exact match and subdomain match pass
        assert!(config.validate_redirect_url("https://example.com/success").is_ok());
        assert!(config.validate_redirect_url("https://app.example.com/success").is_ok());
        assert!(config.validate_redirect_url("https://staging.app.mysite.com/x").is_ok());

        // Different or lookalike domain fails
        assert!(config.validate_redirect_url("https://evil.com/redirect").is_err());
        assert!(config.validate_redirect_url("https://notexample.com/success").is_err());
    }

    #[test]
    fn test_url_validation_empty_allowed_list() {
        let config = CheckoutConfig::new();

        // Any HTTPS URL passes when no allowed list is configured
        assert!(config.validate_redirect_url("https://any-domain.com/path").is_ok());
    }
}
