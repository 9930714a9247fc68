//! Sales reporting: daily counters and period aggregation over orders.
//!
//! All day boundaries are computed in UTC. Weekly periods start on Monday and
//! are labelled with the ISO week (`2026-42`).

use super::money::Money;
use super::order::Order;
use crate::error::{PosError, Result};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

pub const TOP_ITEMS_LIMIT: usize = 10;

/// Daily counters, keyed by `YYYY-MM-DD`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SalesStat {
    pub date: String,
    pub total_revenue: Money,
    pub total_orders: u64,
    pub total_paid_payments: u64,
}

impl SalesStat {
    pub fn empty(date: &str) -> Self {
        Self {
            date: date.to_string(),
            total_revenue: Money::ZERO,
            total_orders: 0,
            total_paid_payments: 0,
        }
    }
}

/// An increment applied to one day's counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SalesEvent {
    OrderCreated,
    PaymentPaid(Money),
}

impl SalesStat {
    pub fn apply(&mut self, event: SalesEvent) {
        match event {
            SalesEvent::OrderCreated => self.total_orders += 1,
            SalesEvent::PaymentPaid(amount) => {
                self.total_revenue += amount;
                self.total_paid_payments += 1;
            }
        }
    }
}

pub fn date_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl FromStr for ReportPeriod {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "custom" => Ok(Self::Custom),
            _ => Err(PosError::validation(
                "Period must be daily, weekly, monthly, or custom",
            )),
        }
    }
}

impl ReportPeriod {
    fn label(&self, at: DateTime<Utc>) -> String {
        match self {
            Self::Daily => at.format("%Y-%m-%d").to_string(),
            Self::Weekly => at.format("%G-%V").to_string(),
            Self::Monthly | Self::Custom => at.format("%Y-%m").to_string(),
        }
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_report_date(raw: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc).date_naive()))
        .map_err(|_| PosError::validation(format!("{field} date must be a valid date (YYYY-MM-DD)")))
}

/// Inclusive UTC range covered by a report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn out_of_range() -> PosError {
    PosError::validation("Start date is out of range")
}

impl DateRange {
    /// From the start of `first` to the last millisecond of `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Result<Self> {
        let start = Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN));
        let end = last
            .and_hms_milli_opt(23, 59, 59, 999)
            .ok_or_else(out_of_range)?;
        Ok(Self {
            start,
            end: Utc.from_utc_datetime(&end),
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    pub fn for_period(
        period: ReportPeriod,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self> {
        let anchor = start.unwrap_or(today);
        match period {
            ReportPeriod::Daily => Self::days(anchor, anchor),
            ReportPeriod::Weekly => {
                let back = Days::new(u64::from(anchor.weekday().num_days_from_monday()));
                let monday = anchor.checked_sub_days(back).ok_or_else(out_of_range)?;
                let sunday = monday
                    .checked_add_days(Days::new(6))
                    .ok_or_else(out_of_range)?;
                Self::days(monday, sunday)
            }
            ReportPeriod::Monthly => {
                let first = anchor.with_day(1).ok_or_else(out_of_range)?;
                let last = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year(), 12, 31)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                        .and_then(|next| next.pred_opt())
                }
                .ok_or_else(out_of_range)?;
                Self::days(first, last)
            }
            ReportPeriod::Custom => match (start, end) {
                (Some(first), Some(last)) if first <= last => Self::days(first, last),
                (Some(_), Some(_)) => Err(PosError::validation(
                    "End date must not be before start date",
                )),
                _ => Err(PosError::validation(
                    "Start and end dates are required for custom range",
                )),
            },
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_revenue: Money,
    pub total_orders: u64,
    pub average_order_value: Money,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub period: ReportPeriod,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBucket {
    pub period: String,
    pub date: DateTime<Utc>,
    pub revenue: Money,
    pub order_count: u64,
    pub average_order_value: Money,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TopItem {
    #[serde(rename = "_id")]
    pub menu_id: u64,
    pub name: String,
    pub quantity: u64,
    pub total_revenue: Money,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub summary: ReportSummary,
    pub periods: Vec<PeriodBucket>,
    pub top_selling_items: Vec<TopItem>,
}

/// Aggregates the sale-bearing orders inside `range`.
///
/// `menu_names` supplies current menu names; lines for deleted menu items fall
/// back to the name stored on the order line.
pub fn build_report(
    period: ReportPeriod,
    range: DateRange,
    orders: &[Order],
    menu_names: &HashMap<u64, String>,
) -> SalesReport {
    let sales: Vec<&Order> = orders
        .iter()
        .filter(|o| o.status.counts_as_sale() && range.contains(o.created_at))
        .collect();

    let mut buckets: HashMap<String, PeriodBucket> = HashMap::new();
    for order in &sales {
        let label = period.label(order.created_at);
        let bucket = buckets.entry(label.clone()).or_insert_with(|| PeriodBucket {
            period: label,
            date: order.created_at,
            revenue: Money::ZERO,
            order_count: 0,
            average_order_value: Money::ZERO,
        });
        bucket.date = bucket.date.min(order.created_at);
        bucket.revenue += order.total_amount;
        bucket.order_count += 1;
    }
    let mut periods: Vec<PeriodBucket> = buckets
        .into_values()
        .map(|mut b| {
            b.average_order_value = b.revenue.average_over(b.order_count);
            b
        })
        .collect();
    periods.sort_by_key(|b| b.date);

    let mut items: HashMap<u64, TopItem> = HashMap::new();
    for line in sales.iter().flat_map(|o| o.items.iter()) {
        let entry = items.entry(line.menu_id).or_insert_with(|| TopItem {
            menu_id: line.menu_id,
            name: menu_names
                .get(&line.menu_id)
                .cloned()
                .or_else(|| (!line.name.is_empty()).then(|| line.name.clone()))
                .unwrap_or_else(|| "Unknown Item".to_string()),
            quantity: 0,
            total_revenue: Money::ZERO,
        });
        entry.quantity += u64::from(line.quantity);
        entry.total_revenue += line.subtotal();
    }
    let mut top_selling_items: Vec<TopItem> = items.into_values().collect();
    top_selling_items.sort_by(|a, b| b.quantity.cmp(&a.quantity).then(a.menu_id.cmp(&b.menu_id)));
    top_selling_items.truncate(TOP_ITEMS_LIMIT);

    let total_revenue: Money = periods.iter().map(|p| p.revenue).sum();
    let total_orders: u64 = periods.iter().map(|p| p.order_count).sum();

    SalesReport {
        summary: ReportSummary {
            total_revenue,
            total_orders,
            average_order_value: total_revenue.average_over(total_orders),
            start_date: range.start,
            end_date: range.end,
            period,
        },
        periods,
        top_selling_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{ItemStatus, OrderItem, OrderPaymentMethod, OrderStatus};
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(id: u64, at: DateTime<Utc>, status: OrderStatus, lines: &[(u64, u32, i64)]) -> Order {
        let items: Vec<OrderItem> = lines
            .iter()
            .enumerate()
            .map(|(i, &(menu_id, quantity, price))| OrderItem {
                id: id * 100 + i as u64,
                menu_id,
                name: format!("Menu {menu_id}"),
                quantity,
                unit_price: Money::new(price.into()).unwrap(),
                status: ItemStatus::Pending,
            })
            .collect();
        Order {
            id,
            table_number: 1,
            customer_name: String::new(),
            total_amount: Order::compute_total(&items),
            items,
            status,
            payment_method: OrderPaymentMethod::Cash,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_weekly_range_starts_monday() {
        // 2026-10-15 is a Thursday.
        let range =
            DateRange::for_period(ReportPeriod::Weekly, Some(ymd(2026, 10, 15)), None, ymd(2026, 1, 1))
                .unwrap();
        assert_eq!(range.start.date_naive(), ymd(2026, 10, 12));
        assert_eq!(range.end.date_naive(), ymd(2026, 10, 18));
    }

    #[test]
    fn test_monthly_range_handles_december() {
        let range =
            DateRange::for_period(ReportPeriod::Monthly, Some(ymd(2026, 12, 9)), None, ymd(2026, 1, 1))
                .unwrap();
        assert_eq!(range.start.date_naive(), ymd(2026, 12, 1));
        assert_eq!(range.end.date_naive(), ymd(2026, 12, 31));
    }

    #[test]
    fn test_ranges_at_the_calendar_limits() {
        let today = ymd(2026, 10, 19);
        for period in [ReportPeriod::Daily, ReportPeriod::Monthly] {
            let range = DateRange::for_period(period, Some(NaiveDate::MAX), None, today).unwrap();
            assert_eq!(range.end.date_naive(), NaiveDate::MAX);
            let range = DateRange::for_period(period, Some(NaiveDate::MIN), None, today).unwrap();
            assert_eq!(range.start.date_naive(), NaiveDate::MIN);
        }
        let range =
            DateRange::for_period(ReportPeriod::Custom, Some(NaiveDate::MIN), Some(NaiveDate::MAX), today)
                .unwrap();
        assert!(range.contains(Utc::now()));

        // The last date is a Monday and the first a Thursday, so both weeks
        // spill past the calendar.
        for edge in [NaiveDate::MAX, NaiveDate::MIN] {
            let err = DateRange::for_period(ReportPeriod::Weekly, Some(edge), None, today).unwrap_err();
            assert_eq!(err.to_string(), "Start date is out of range");
        }
    }

    #[test]
    fn test_custom_range_requires_both_dates() {
        let today = ymd(2026, 10, 19);
        assert!(DateRange::for_period(ReportPeriod::Custom, Some(today), None, today).is_err());
        assert!(
            DateRange::for_period(ReportPeriod::Custom, Some(today), Some(ymd(2026, 10, 1)), today)
                .is_err()
        );
        let range =
            DateRange::for_period(ReportPeriod::Custom, Some(ymd(2026, 10, 1)), Some(today), today)
                .unwrap();
        assert!(range.contains(Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_report_date_parsing() {
        assert_eq!(parse_report_date("2026-10-19", "Start").unwrap(), ymd(2026, 10, 19));
        assert_eq!(
            parse_report_date("2026-10-19T10:00:00Z", "Start").unwrap(),
            ymd(2026, 10, 19)
        );
        assert!(parse_report_date("19/10/2026", "Start").is_err());
    }

    #[test]
    fn test_build_report_aggregates_sale_orders_only() {
        let day1 = Utc.with_ymd_and_hms(2026, 10, 12, 9, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 10, 13, 12, 0, 0).unwrap();
        let orders = vec![
            order(1, day1, OrderStatus::Completed, &[(1, 2, 25000), (2, 1, 5000)]),
            order(2, day2, OrderStatus::Ready, &[(2, 3, 5000)]),
            order(3, day2, OrderStatus::Pending, &[(1, 10, 25000)]),
            order(4, day2, OrderStatus::Cancelled, &[(1, 10, 25000)]),
        ];
        let names = HashMap::from([(1, "Nasi Goreng".to_string())]);
        let range = DateRange::days(ymd(2026, 10, 12), ymd(2026, 10, 18)).unwrap();

        let report = build_report(ReportPeriod::Daily, range, &orders, &names);

        assert_eq!(report.summary.total_orders, 2);
        assert_eq!(report.summary.total_revenue, Money::new(dec!(70000)).unwrap());
        assert_eq!(report.summary.average_order_value, Money::new(dec!(35000)).unwrap());
        assert_eq!(report.periods.len(), 2);
        assert_eq!(report.periods[0].period, "2026-10-12");
        assert_eq!(report.periods[1].revenue, Money::new(dec!(15000)).unwrap());

        assert_eq!(report.top_selling_items[0].menu_id, 2);
        assert_eq!(report.top_selling_items[0].quantity, 4);
        assert_eq!(report.top_selling_items[0].name, "Menu 2");
        assert_eq!(report.top_selling_items[1].name, "Nasi Goreng");
    }

    #[test]
    fn test_weekly_labels_use_iso_week() {
        let at = Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap();
        assert_eq!(ReportPeriod::Weekly.label(at), "2026-42");
        assert_eq!(ReportPeriod::Custom.label(at), "2026-10");
    }

    #[test]
    fn test_empty_report() {
        let range = DateRange::days(ymd(2026, 10, 19), ymd(2026, 10, 19)).unwrap();
        let report = build_report(ReportPeriod::Daily, range, &[], &HashMap::new());
        assert_eq!(report.summary.total_orders, 0);
        assert_eq!(report.summary.average_order_value, Money::ZERO);
        assert!(report.periods.is_empty());
        assert!(report.top_selling_items.is_empty());
    }

    #[test]
    fn test_stat_events() {
        let mut stat = SalesStat::empty("2026-10-19");
        stat.apply(SalesEvent::OrderCreated);
        stat.apply(SalesEvent::PaymentPaid(Money::new(dec!(15000)).unwrap()));
        assert_eq!(stat.total_orders, 1);
        assert_eq!(stat.total_paid_payments, 1);
        assert_eq!(stat.total_revenue, Money::new(dec!(15000)).unwrap());
    }
}
