//! Energy trade history and kWh stock, persisted next to the session.

use std::fmt;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::session::store::{KeyValueStore, RetrievalMode, StorageError, TypedStoreExt, keys};

/// Stock shown before anything has been saved (kWh).
pub const DEFAULT_STOCK_KWH: f64 = 87.5;

/// Activity pages only look this far back.
pub const HISTORY_WINDOW_MONTHS: u32 = 2;

/// Entries shown on the dashboard.
pub const DASHBOARD_RECENT: usize = 3;

#[derive(Error, Debug)]
pub enum ActivityError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("not enough energy: requested {requested:.2} kWh, {available:.2} kWh available")]
    InsufficientStock { requested: f64, available: f64 },

    #[error("amount must be greater than 0, got {0}")]
    NonPositiveAmount(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[serde(alias = "compra")]
    Purchase,
    #[serde(alias = "venta")]
    Sale,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Sale => "sale",
        }
    }
}

/// One energy trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    /// Energy moved, kWh (always positive; the kind gives the direction).
    /// Older records store it as display text such as `"+25 kWh"`.
    #[serde(deserialize_with = "kwh_from_number_or_text")]
    pub amount: f64,
    #[serde(alias = "time")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Parses `25`, `"25"`, `"+25 kWh"`, or `"-10 kWh"` into an absolute kWh value.
fn parse_kwh(text: &str) -> Option<f64> {
    let text = text.trim();
    let number = text
        .strip_suffix("kWh")
        .or_else(|| text.strip_suffix("kwh"))
        .unwrap_or(text)
        .trim();
    let number = number.strip_prefix('+').unwrap_or(number);
    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(f64::abs)
}

fn kwh_from_number_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n.abs()),
        NumberOrText::Text(text) => parse_kwh(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid energy amount \"{text}\""))
        }),
    }
}

fn id_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(id) => id,
        Id::Int(id) => id.to_string(),
    })
}

impl Transaction {
    /// `+25 kWh` for purchases, `-10 kWh` for sales.
    pub fn signed_amount(&self) -> String {
        let sign = match self.kind {
            TransactionKind::Purchase => '+',
            TransactionKind::Sale => '-',
        };
        format!("{sign}{} kWh", self.amount)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<8} {:>12}  {}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.kind.as_str(),
            self.signed_amount(),
            self.description
        )
    }
}

/// Start of the activity window ending at `now`.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(HISTORY_WINDOW_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Transactions of `kind` inside the two-month window, newest first.
///
/// Applying it to its own output returns the same list.
pub fn filter_recent(
    transactions: &[Transaction],
    kind: TransactionKind,
    now: DateTime<Utc>,
) -> Vec<Transaction> {
    let start = window_start(now);
    let mut selected: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| tx.kind == kind && tx.timestamp >= start)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
    selected
}

/// History (newest first) and current stock.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub history: Vec<Transaction>,
    pub stock_kwh: f64,
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            stock_kwh: DEFAULT_STOCK_KWH,
        }
    }
}

impl Activity {
    /// Reads history and stock. Missing keys give an empty history and
    /// [`DEFAULT_STOCK_KWH`]; an unreadable stock value is ignored with a
    /// warning.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self, ActivityError> {
        let history = store
            .get_json::<Vec<Transaction>>(keys::TRANSACTION_HISTORY, RetrievalMode::Fail)?
            .unwrap_or_default();

        let stock_kwh = match store.get_json::<f64>(keys::USER_STOCK_KWH, RetrievalMode::Safe)? {
            Some(v) if v.is_finite() => v,
            Some(_) | None => {
                if store.get(keys::USER_STOCK_KWH)?.is_some() {
                    tracing::warn!("ignoring unreadable {}", keys::USER_STOCK_KWH);
                }
                DEFAULT_STOCK_KWH
            }
        };

        Ok(Self { history, stock_kwh })
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), ActivityError> {
        store.set_json(keys::TRANSACTION_HISTORY, &self.history)?;
        store.set(keys::USER_STOCK_KWH, &self.stock_kwh.to_string())?;
        Ok(())
    }

    /// The first `n` entries of the history.
    pub fn recent(&self, n: usize) -> &[Transaction] {
        &self.history[..n.min(self.history.len())]
    }

    pub fn purchases(&self, now: DateTime<Utc>) -> Vec<Transaction> {
        filter_recent(&self.history, TransactionKind::Purchase, now)
    }

    pub fn sales(&self, now: DateTime<Utc>) -> Vec<Transaction> {
        filter_recent(&self.history, TransactionKind::Sale, now)
    }

    /// Adds energy to stock and records the purchase at the head of history.
    pub fn record_purchase(
        &mut self,
        kwh: f64,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, ActivityError> {
        if kwh <= 0.0 || !kwh.is_finite() {
            return Err(ActivityError::NonPositiveAmount(kwh));
        }
        self.stock_kwh += kwh;
        Ok(self.push(TransactionKind::Purchase, kwh, description, now))
    }

    /// Adds a share of community generation to stock. Generation is not a
    /// trade, so history is left alone.
    pub fn credit_generation(&mut self, kwh: f64) -> Result<(), ActivityError> {
        if kwh <= 0.0 || !kwh.is_finite() {
            return Err(ActivityError::NonPositiveAmount(kwh));
        }
        self.stock_kwh += kwh;
        Ok(())
    }

    /// Removes energy from stock and records the sale. Selling more than the
    /// stock holds is rejected.
    pub fn record_sale(
        &mut self,
        kwh: f64,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<&Transaction, ActivityError> {
        if kwh <= 0.0 || !kwh.is_finite() {
            return Err(ActivityError::NonPositiveAmount(kwh));
        }
        if kwh > self.stock_kwh {
            return Err(ActivityError::InsufficientStock {
                requested: kwh,
                available: self.stock_kwh,
            });
        }
        self.stock_kwh -= kwh;
        Ok(self.push(TransactionKind::Sale, kwh, description, now))
    }

    fn push(
        &mut self,
        kind: TransactionKind,
        kwh: f64,
        description: &str,
        now: DateTime<Utc>,
    ) -> &Transaction {
        self.history.insert(
            0,
            Transaction {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                description: description.to_string(),
                amount: kwh,
                timestamp: now,
            },
        );
        &self.history[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 21, 12, 0, 0).unwrap()
    }

    fn tx(id: &str, kind: TransactionKind, days_ago: i64) -> Transaction {
        Transaction {
            id: id.to_string(),
            kind,
            description: format!("tx {id}"),
            amount: 10.0,
            timestamp: now() - Duration::days(days_ago),
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("a", TransactionKind::Purchase, 1),
            tx("b", TransactionKind::Sale, 2),
            tx("c", TransactionKind::Purchase, 40),
            tx("d", TransactionKind::Purchase, 90),
            tx("e", TransactionKind::Sale, 59),
            tx("f", TransactionKind::Purchase, 0),
        ]
    }

    #[test]
    fn window_is_two_calendar_months() {
        assert_eq!(
            window_start(now()),
            Utc.with_ymd_and_hms(2025, 9, 21, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn filters_by_kind_and_window_newest_first() {
        let purchases = filter_recent(&sample(), TransactionKind::Purchase, now());
        let ids: Vec<&str> = purchases.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["f", "a", "c"]);

        let sales = filter_recent(&sample(), TransactionKind::Sale, now());
        let ids: Vec<&str> = sales.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "e"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        for kind in [TransactionKind::Purchase, TransactionKind::Sale] {
            let once = filter_recent(&sample(), kind, now());
            let twice = filter_recent(&once, kind, now());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let edge = Transaction {
            timestamp: window_start(now()),
            ..tx("edge", TransactionKind::Sale, 0)
        };
        assert_eq!(filter_recent(&[edge], TransactionKind::Sale, now()).len(), 1);
    }

    #[test]
    fn legacy_spanish_tags_and_time_field_parse() {
        let json = r#"[{"id":"1","type":"compra","description":"Compra de energía","amount":25,"time":"2025-11-20T10:00:00Z"},
                       {"id":"2","type":"venta","description":"Venta al mercado","amount":10,"timestamp":"2025-11-19T10:00:00Z"}]"#;
        let txs: Vec<Transaction> = serde_json::from_str(json).unwrap();
        assert_eq!(txs[0].kind, TransactionKind::Purchase);
        assert_eq!(txs[1].kind, TransactionKind::Sale);
        assert_eq!(txs[0].signed_amount(), "+25 kWh");
        assert_eq!(txs[1].signed_amount(), "-10 kWh");

        let json = r#"[{"id":1,"type":"compra","description":"Compra de energía","amount":"+25 kWh","time":"2025-11-20T10:00:00Z"},
                       {"id":"2","type":"venta","description":"Venta al mercado","amount":"-10.5 kWh","time":"2025-11-19T10:00:00Z"}]"#;
        let mut store = MemoryStore::new();
        store.set(keys::TRANSACTION_HISTORY, json).unwrap();
        let activity = Activity::load(&store).unwrap();
        assert_eq!(activity.history[0].id, "1");
        assert_eq!(activity.history[0].amount, 25.0);
        assert_eq!(activity.history[1].amount, 10.5);
        assert_eq!(activity.history[1].signed_amount(), "-10.5 kWh");
    }

    #[test]
    fn energy_amount_text_forms() {
        assert_eq!(parse_kwh("+25 kWh"), Some(25.0));
        assert_eq!(parse_kwh("-8 kWh"), Some(8.0));
        assert_eq!(parse_kwh(" 12.5kWh "), Some(12.5));
        assert_eq!(parse_kwh("40"), Some(40.0));
        assert_eq!(parse_kwh("lots kWh"), None);
        assert_eq!(parse_kwh("inf"), None);
    }

    #[test]
    fn generation_credit_raises_stock_only() {
        let mut activity = Activity::default();
        activity.credit_generation(12.5).unwrap();
        assert_eq!(activity.stock_kwh, 100.0);
        assert!(activity.history.is_empty());
        assert!(matches!(
            activity.credit_generation(0.0),
            Err(ActivityError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn load_defaults_when_store_empty() {
        let activity = Activity::load(&MemoryStore::new()).unwrap();
        assert!(activity.history.is_empty());
        assert_eq!(activity.stock_kwh, DEFAULT_STOCK_KWH);
    }

    #[test]
    fn load_ignores_bad_stock_value() {
        let mut store = MemoryStore::new();
        store.set(keys::USER_STOCK_KWH, "lots").unwrap();
        assert_eq!(Activity::load(&store).unwrap().stock_kwh, DEFAULT_STOCK_KWH);
    }

    #[test]
    fn purchase_and_sale_update_stock_and_history() {
        let mut activity = Activity::default();
        activity.record_purchase(25.0, "from G7Y3", now()).unwrap();
        activity.record_sale(10.0, "to market", now()).unwrap();
        assert_eq!(activity.stock_kwh, 102.5);
        assert_eq!(activity.history[0].kind, TransactionKind::Sale);
        assert_eq!(activity.recent(DASHBOARD_RECENT).len(), 2);
    }

    #[test]
    fn overselling_is_rejected() {
        let mut activity = Activity::default();
        let err = activity.record_sale(100.0, "too much", now()).unwrap_err();
        assert!(matches!(err, ActivityError::InsufficientStock { .. }));
        assert_eq!(activity.stock_kwh, DEFAULT_STOCK_KWH);
        assert!(activity.history.is_empty());
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let mut activity = Activity::default();
        assert!(activity.record_purchase(0.0, "", now()).is_err());
        assert!(activity.record_sale(-1.0, "", now()).is_err());
    }

    #[test]
    fn save_then_load() {
        let mut store = MemoryStore::new();
        let mut activity = Activity::default();
        activity.record_purchase(5.0, "x", now()).unwrap();
        activity.save(&mut store).unwrap();
        assert_eq!(store.get(keys::USER_STOCK_KWH).unwrap().as_deref(), Some("92.5"));
        assert_eq!(Activity::load(&store).unwrap(), activity);
    }
}
