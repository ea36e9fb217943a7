use serde::{Deserialize, Serialize};

use crate::domain::{Cursor, PageInfo};

pub const METRIC_REPORT_QUERY: &str = r#"query MetricReport($input: MetricReportInput!) {
  metricReport(input: $input) {
    headers
    rows
    pageInfo {
      hasNextPage
      hasPreviousPage
      startCursor
      endCursor
    }
  }
}
"#;

pub const DEFAULT_RELATIVE_TIME_RANGE: &str = "PREVIOUS_MONTH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub relative: String,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            relative: DEFAULT_RELATIVE_TIME_RANGE.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSelection {
    pub unique_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSelection {
    pub column_name: String,
    pub display_name: String,
}

/// Caller-owned part of every report query; the controller only adds paging fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseQuery {
    pub time_range: TimeRange,
    pub metrics: Vec<MetricSelection>,
    pub dimensions: Vec<DimensionSelection>,
}

impl Default for BaseQuery {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            metrics: vec![MetricSelection {
                unique_name: "revenue".into(),
            }],
            dimensions: vec![
                DimensionSelection {
                    column_name: "PRODUCT_NAME".into(),
                    display_name: "Product name".into(),
                },
                DimensionSelection {
                    column_name: "PRODUCT_CATEGORY".into(),
                    display_name: "Product category".into(),
                },
            ],
        }
    }
}

/// Variables of one report request.
///
/// Only the constructors can set paging fields, so a value never carries both
/// the forward pair (`first`/`after`) and the backward pair (`last`/`before`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariables {
    #[serde(flatten)]
    base: BaseQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    first: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<Cursor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    before: Option<Cursor>,
}

impl QueryVariables {
    pub fn initial(base: BaseQuery, page_size: u32) -> Self {
        Self {
            base,
            first: Some(page_size),
            after: None,
            last: None,
            before: None,
        }
    }

    pub fn forward(base: BaseQuery, page_size: u32, after: Cursor) -> Self {
        Self {
            base,
            first: Some(page_size),
            after: Some(after),
            last: None,
            before: None,
        }
    }

    pub fn backward(base: BaseQuery, page_size: u32, before: Cursor) -> Self {
        Self {
            base,
            first: None,
            after: None,
            last: Some(page_size),
            before: Some(before),
        }
    }

    pub fn base(&self) -> &BaseQuery {
        &self.base
    }

    pub fn first(&self) -> Option<u32> {
        self.first
    }

    pub fn after(&self) -> Option<&Cursor> {
        self.after.as_ref()
    }

    pub fn last(&self) -> Option<u32> {
        self.last
    }

    pub fn before(&self) -> Option<&Cursor> {
        self.before.as_ref()
    }
}

/// Untransformed tabular payload as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub page_info: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct ReportInput<'a> {
    pub input: &'a QueryVariables,
}

#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a> {
    pub query: &'a str,
    pub variables: ReportInput<'a>,
}

impl<'a> GraphqlRequest<'a> {
    pub fn metric_report(variables: &'a QueryVariables) -> Self {
        Self {
            query: METRIC_REPORT_QUERY,
            variables: ReportInput { input: variables },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReportData {
    pub metric_report: Option<RawReport>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlResponse {
    pub data: Option<MetricReportData>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
