//! Shared GraphQL transport for the commerce and Shopify clients.
//!
//! Operations are declared with [`graphql_operation!`], which implements
//! `graphql_client::GraphQLQuery` for a hand-written variables/response pair.
//! Requests go out through `reqwest` directly and come back as
//! `graphql_client::Response` envelopes.

use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use reqwest::header::{HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Declare a GraphQL operation.
///
/// ```rust,ignore
/// graphql_operation!(
///     /// Fetch a checkout by id.
///     CheckoutQuery, "Checkout", CHECKOUT_QUERY,
///     CheckoutVariables => CheckoutData
/// );
/// ```
#[macro_export]
macro_rules! graphql_operation {
    ($(#[$meta:meta])* $name:ident, $operation:literal, $query:expr, $vars:ty => $data:ty) => {
        $(#[$meta])*
        pub struct $name;

        impl ::graphql_client::GraphQLQuery for $name {
            type Variables = $vars;
            type ResponseData = $data;

            fn build_query(
                variables: Self::Variables,
            ) -> ::graphql_client::QueryBody<Self::Variables> {
                ::graphql_client::QueryBody {
                    variables,
                    query: $query,
                    operation_name: $operation,
                }
            }
        }
    };
}

/// Errors that can occur at the GraphQL transport level.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the upstream API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// A GraphQL error returned by an upstream API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// How a client authenticates against its GraphQL endpoint.
#[derive(Clone)]
pub struct AuthHeader {
    pub name: HeaderName,
    pub value: SecretString,
}

/// A reusable GraphQL-over-HTTP transport.
#[derive(Clone)]
pub struct GraphQLTransport {
    client: reqwest::Client,
    endpoint: String,
    auth: AuthHeader,
}

impl GraphQLTransport {
    /// Build a transport with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        auth: AuthHeader,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            auth,
        })
    }

    /// The endpoint requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a GraphQL operation and return its data.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, unparseable
    /// body, GraphQL errors, or a response without data.
    pub async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, TransportError> {
        let request_body = Q::build_query(variables);
        let operation = request_body.operation_name;

        let auth_value = HeaderValue::from_str(self.auth.value.expose_secret())
            .map_err(|_| TransportError::GraphQL(vec![GraphQLError::message(
                "access token contains characters not allowed in a header",
            )]))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(self.auth.name.clone(), auth_value)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(TransportError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation,
                body = %response_text.chars().take(500).collect::<String>(),
                "GraphQL endpoint returned non-success status"
            );
            return Err(TransportError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            ))]));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse GraphQL response"
                );
                return Err(TransportError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, operation, "GraphQL errors in response");

            return Err(TransportError::GraphQL(
                errors.into_iter().map(convert_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation,
                body = %response_text.chars().take(500).collect::<String>(),
                "GraphQL response has no data and no errors"
            );
            TransportError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }
}

fn convert_error(e: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}
