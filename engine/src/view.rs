//! Day view over the orders: filter by date and text, sort by time.

use crate::{AppState, Order};
use chrono::{NaiveDate, NaiveTime};
use std::cmp::Ordering;

/// Sort direction toggle for the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Filters for [`visible_orders`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Exact date to show. `None` shows every date.
    pub date: Option<NaiveDate>,
    /// Case-insensitive free text; blank matches everything.
    pub text: String,
    pub direction: SortDirection,
}

impl OrderQuery {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Client name and phone shown for an order: the live client if it still
/// exists, otherwise the snapshot saved on the order.
pub fn client_display<'a>(state: &'a AppState, order: &'a Order) -> (&'a str, &'a str) {
    match state.client(&order.client_id) {
        Some(client) => (&client.name, &client.phone),
        None => (&order.client_name, &order.client_phone),
    }
}

fn matches_text(state: &AppState, order: &Order, needle: &str) -> bool {
    let (name, phone) = client_display(state, order);
    let items = order
        .items
        .iter()
        .map(|item| item.name.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let total = order.total.normalize().to_string();

    [name, phone, items.as_str(), total.as_str()]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Missing time sorts before any time of the same day.
fn sort_key(order: &Order) -> (NaiveDate, Option<NaiveTime>) {
    (order.date, order.time)
}

/// Orders matching `query`, sorted by `(date, time)`.
///
/// The sort is stable, so orders with equal keys keep their stored order.
pub fn visible_orders<'a>(state: &'a AppState, query: &OrderQuery) -> Vec<&'a Order> {
    let needle = query.text.trim().to_lowercase();
    let mut orders: Vec<&Order> = state
        .orders
        .iter()
        .filter(|order| query.date.map_or(true, |date| order.date == date))
        .filter(|order| needle.is_empty() || matches_text(state, order, &needle))
        .collect();

    orders.sort_by(|a, b| {
        let ordering: Ordering = sort_key(a).cmp(&sort_key(b));
        match query.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    orders
}
