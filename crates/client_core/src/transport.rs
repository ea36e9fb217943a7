use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    error::ReportError,
    protocol::{GraphqlRequest, GraphqlResponse, QueryVariables, RawReport, ReportInput},
};
use tracing::{debug, warn};
use url::Url;

use crate::{credentials::AccessToken, QueryExecutor};

/// Posts report queries to a GraphQL endpoint with bearer authentication.
pub struct GraphqlQueryExecutor {
    http: Client,
    endpoint: Url,
}

impl GraphqlQueryExecutor {
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> Result<Self, ReportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ReportError::transport(format!("failed to build http client: {err}")))?;
        Ok(Self::with_client(http, endpoint))
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl QueryExecutor for GraphqlQueryExecutor {
    async fn execute(
        &self,
        query: &str,
        variables: &QueryVariables,
        token: &AccessToken,
    ) -> Result<RawReport, ReportError> {
        let request = GraphqlRequest {
            query,
            variables: ReportInput { input: variables },
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(token.secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| ReportError::transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ReportError::auth(format!(
                "graphql endpoint rejected token: {status}"
            )));
        }
        if !status.is_success() {
            return Err(ReportError::transport(format!(
                "graphql endpoint returned {status}"
            )));
        }

        let body: GraphqlResponse = response
            .json()
            .await
            .map_err(|err| ReportError::transport(format!("malformed graphql response: {err}")))?;

        if !body.errors.is_empty() {
            let messages = body
                .errors
                .iter()
                .map(|err| err.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!("graphql: query returned errors: {messages}");
            return Err(ReportError::Query(messages));
        }

        let report = body
            .data
            .and_then(|data| data.metric_report)
            .ok_or_else(|| ReportError::transport("graphql response carried no metricReport"))?;
        debug!(
            headers = report.headers.len(),
            rows = report.rows.len(),
            "graphql: metric report received"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
