use serde::Serialize;
use shared::domain::{ColumnDescriptor, PageInfo, RowRecord};

/// Render-ready projection of the latest successful fetch.
///
/// Renderers only read it; every new page replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportViewModel {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<RowRecord>,
    pub page_info: PageInfo,
}

impl ReportViewModel {
    pub fn has_next_page(&self) -> bool {
        self.page_info.has_next_page
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_info.has_previous_page
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
