//! Marketplace listings, the neighbourhood savings ranking, and trades
//! against the local activity ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::activity::{Activity, ActivityError, Transaction};
use crate::session::short_address;

/// An energy offer on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: u32,
    pub seller: String,
    /// kWh offered.
    pub amount: f64,
    pub price_per_kwh: f64,
}

impl Offer {
    pub fn new(id: u32, seller: &str, amount: f64, price_per_kwh: f64) -> Self {
        Self {
            id,
            seller: seller.to_string(),
            amount,
            price_per_kwh,
        }
    }

    pub fn total(&self) -> f64 {
        self.amount * self.price_per_kwh
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<3} {:<14} {:>6.1} kWh @ {:.2} = {:>6.2}",
            self.id,
            short_address(&self.seller),
            self.amount,
            self.price_per_kwh,
            self.total()
        )
    }
}

/// A household in the savings ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub name: String,
    pub address: String,
    pub savings_percent: u8,
    pub stars: u8,
    pub zk_verified: bool,
}

impl fmt::Display for RankingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} {:>3}% {:<5} {}",
            self.name,
            self.savings_percent,
            "*".repeat(usize::from(self.stars)),
            if self.zk_verified { "zk-verified" } else { "" }
        )
    }
}

/// Current listings.
pub fn offers() -> Vec<Offer> {
    vec![
        Offer::new(1, "G7Y3KML4RTH8PLQW5XN9ZV2F6J1K4L2", 50.0, 0.50),
        Offer::new(2, "F2M8PQW3NRT6YKL9XHV1ZJ4C5B7A8D9", 30.0, 0.48),
        Offer::new(3, "H4K9LXC2VBN7TQW6PMZ3RF1J8Y5M4N3", 75.0, 0.52),
        Offer::new(4, "P6R1WQX4JKL9NVB2THY8MZC5F3G7D2K", 40.0, 0.49),
        Offer::new(5, "M3N7YFG9QWX2PKL6RHV4JZC1TB8D5N9", 60.0, 0.51),
        Offer::new(6, "L8T4VXN2HKW9JPQ5RMY6FCZ3GB1D7K4", 45.0, 0.47),
    ]
}

pub fn find_offer(id: u32) -> Option<Offer> {
    offers().into_iter().find(|o| o.id == id)
}

/// Savings ranking, best first.
pub fn ranking() -> Vec<RankingEntry> {
    let entry = |name: &str, address: &str, savings_percent, stars, zk_verified| RankingEntry {
        name: name.to_string(),
        address: address.to_string(),
        savings_percent,
        stars,
        zk_verified,
    };
    vec![
        entry("María G.", "G7Y3KML4RTH8PLQW5XN9ZV2F6J1K4L2", 42, 5, true),
        entry("Carlos R.", "F2M8PQW3NRT6YKL9XHV1ZJ4C5B7A8D9", 38, 4, true),
        entry("Ana L.", "H4K9LXC2VBN7TQW6PMZ3RF1J8Y5M4N3", 35, 4, true),
        entry("Pedro M.", "P6R1WQX4JKL9NVB2THY8MZC5F3G7D2K", 31, 3, false),
        entry("Laura S.", "M3N7YFG9QWX2PKL6RHV4JZC1TB8D5N9", 28, 3, true),
    ]
}

/// Buys a whole offer: stock goes up by its amount.
pub fn buy<'a>(
    activity: &'a mut Activity,
    offer: &Offer,
    now: DateTime<Utc>,
) -> Result<&'a Transaction, ActivityError> {
    let description = format!(
        "Energy purchase from {} at {:.2}/kWh",
        short_address(&offer.seller),
        offer.price_per_kwh
    );
    activity.record_purchase(offer.amount, &description, now)
}

/// Sells `kwh` from stock to the market.
pub fn sell(
    activity: &mut Activity,
    kwh: f64,
    price_per_kwh: f64,
    now: DateTime<Utc>,
) -> Result<&Transaction, ActivityError> {
    let description = format!("Sale to market at {price_per_kwh:.2}/kWh");
    activity.record_sale(kwh, &description, now)
}

/// Avatar placeholder colour derived from an address, as `hsl(h, 65%, 55%)`.
///
/// Hash: `h = c + ((h << 5) - h)` over UTF-16 code units, with the shift on
/// the 32-bit truncation of `h`.
pub fn identicon_color(address: &str) -> String {
    let mut hash: i64 = 0;
    for unit in address.encode_utf16() {
        let shifted = i64::from((hash as i32).wrapping_shl(5));
        hash = i64::from(unit) + (shifted - hash);
    }
    let hue = (hash % 360).rem_euclid(360);
    format!("hsl({hue}, 65%, 55%)")
}
