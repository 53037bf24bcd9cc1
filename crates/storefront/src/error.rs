//! Cart error type with Sentry integration.
//!
//! Failures talking to the remote cart are captured to Sentry before they
//! surface as a notice. Cart operations return `Result<(), CartError>` so a
//! caller can tell a failed action from a successful one.

use thiserror::Error;

use crate::api::GatewayError;

/// Cart-level error.
#[derive(Debug, Error)]
pub enum CartError {
    /// Remote cart operation failed.
    #[error("Cart API error: {0}")]
    Gateway(#[from] GatewayError),

    /// Operation needs a logged-in user.
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl CartError {
    /// Whether the error is worth reporting to Sentry.
    ///
    /// Expected conditions (no token, rejected token, rate limiting) are not.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Gateway(err) => !matches!(
                err,
                GatewayError::MissingToken | GatewayError::Unauthorized | GatewayError::RateLimited(_)
            ),
            Self::NotAuthenticated => false,
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Log a failed cart action, capturing it to Sentry when reportable.
pub fn report_failure(action: &str, err: &CartError) {
    if err.is_reportable() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            action,
            error = %err,
            sentry_event_id = %event_id,
            "Cart action failed"
        );
    } else {
        tracing::warn!(action, error = %err, "Cart action failed");
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::from(GatewayError::Unauthorized);
        assert_eq!(err.to_string(), "Cart API error: Unauthorized");
        assert_eq!(CartError::NotAuthenticated.to_string(), "Not authenticated");
    }

    #[test]
    fn test_reportable_errors() {
        assert!(
            CartError::from(GatewayError::Api {
                status: 500,
                message: "boom".to_string()
            })
            .is_reportable()
        );
        assert!(!CartError::from(GatewayError::MissingToken).is_reportable());
        assert!(!CartError::from(GatewayError::RateLimited(3)).is_reportable());
        assert!(!CartError::NotAuthenticated.is_reportable());
    }

    #[test]
    fn test_report_failure_without_sentry_client() {
        // No client bound: capture is a no-op and must not panic.
        report_failure("add_item", &CartError::from(GatewayError::Unauthorized));
        report_failure(
            "add_item",
            &CartError::from(GatewayError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            }),
        );
        add_breadcrumb("cart", "Added item", Some(&[("product_id", "7")]));
    }
}
