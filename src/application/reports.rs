use crate::domain::ports::{MenuStoreRef, OrderStoreRef, SalesStatStoreRef};
use crate::domain::sales::{
    DateRange, ReportPeriod, SalesReport, SalesStat, build_report, parse_report_date,
};
use crate::error::Result;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Query string of the sales report endpoint.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Clone)]
pub struct ReportService {
    orders: OrderStoreRef,
    menu: MenuStoreRef,
    sales: SalesStatStoreRef,
}

fn parse_optional(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_report_date(s, field))
        .transpose()
}

impl ReportService {
    pub fn new(orders: OrderStoreRef, menu: MenuStoreRef, sales: SalesStatStoreRef) -> Self {
        Self {
            orders,
            menu,
            sales,
        }
    }

    pub async fn sales_report(&self, query: &ReportQuery) -> Result<SalesReport> {
        let period = match query.period.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<ReportPeriod>()?,
            _ => ReportPeriod::default(),
        };
        let start = parse_optional(query.start.as_deref(), "Start")?;
        let end = parse_optional(query.end.as_deref(), "End")?;
        let range = DateRange::for_period(period, start, end, Utc::now().date_naive())?;

        let orders = self.orders.list().await?;
        let menu_names: HashMap<u64, String> = self
            .menu
            .list()
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        tracing::debug!(?period, start = %range.start, end = %range.end, "building sales report");
        Ok(build_report(period, range, &orders, &menu_names))
    }

    /// The counters for `date` (today when absent), zeros when nothing happened.
    pub async fn daily_stat(&self, date: Option<&str>) -> Result<SalesStat> {
        let day = parse_optional(date, "Date")?.unwrap_or_else(|| Utc::now().date_naive());
        let key = day.format("%Y-%m-%d").to_string();
        Ok(self
            .sales
            .get(&key)
            .await?
            .unwrap_or_else(|| SalesStat::empty(&key)))
    }
}
