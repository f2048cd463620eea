use serde::{Deserialize, Serialize};

use super::DateRange;
use crate::client::{Endpoints, ResourceClient};
use crate::dispatcher::{Dispatcher, Intent};
use crate::error::ApiError;
use crate::resource::{Identified, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Excel,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "excel",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "xlsx",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesLine {
    pub product_name: String,
    pub quantity: u32,
    pub revenue: f64,
}

/// Farmer sales for one period. The period is the report's identity, so
/// the server must always send it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    pub period: String,
    #[serde(default)]
    pub total_orders: u32,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub lines: Vec<SalesLine>,
}

impl Identified for SalesReport {
    fn id(&self) -> String {
        self.period.clone()
    }
}

#[derive(Clone)]
pub struct Sales {
    reports: ResourceClient<SalesReport>,
}

impl Sales {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            reports: ResourceClient::new(dispatcher, "salesReports", Endpoints::rest("sales/reports")),
        }
    }

    pub async fn state(&self) -> Resource<SalesReport> {
        self.reports.state().await
    }

    pub async fn fetch(&self, range: DateRange) -> Result<Vec<SalesReport>, ApiError> {
        self.reports.fetch_with(range.query()).await
    }

    pub async fn total_revenue(&self) -> f64 {
        let store = self.reports.store();
        let store = store.read().await;
        store.items().iter().map(|r| r.total_revenue).sum()
    }

    /// Raw PDF or spreadsheet bytes.
    pub async fn export(&self, range: DateRange, format: ExportFormat) -> Result<Vec<u8>, ApiError> {
        let mut intent = Intent::get("sales/reports/export").query("format", format.as_str());
        intent.query.extend(range.query());
        self.reports.dispatcher().download(intent).await
    }
}
