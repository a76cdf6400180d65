// 💳 Card Entity - corporate or personal payment card of an entrepreneur
//
// A card is identified for deduplication by (entrepreneur, mask, type).
// Its per-period status map keeps one entry per period label, each split
// into corporate / market / personal axes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Cell values meaning "entrepreneur has no card of this type"
pub const NO_CARD_SENTINELS: [&str; 2] = ["-", "--"];

// ============================================================================
// CARD TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    /// Corporate card ("Корп. карта")
    Corp,

    /// Personal card of the individual ("Карта ФЛ")
    Personal,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Corp => "corp",
            CardType::Personal => "personal",
        }
    }

    /// Axis of the period map the importer writes for this card type
    pub fn axis(&self) -> StatusAxis {
        match self {
            CardType::Corp => StatusAxis::Corporate,
            CardType::Personal => StatusAxis::Personal,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "corp" => Ok(CardType::Corp),
            "personal" => Ok(CardType::Personal),
            other => Err(format!("unknown card type: {:?}", other)),
        }
    }
}

// ============================================================================
// PERIOD STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAxis {
    Corporate,
    Market,
    Personal,
}

/// Status of one card within one period
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<String>,
}

impl PeriodStatus {
    /// Status with a single axis set
    pub fn single(axis: StatusAxis, value: &str) -> Self {
        let mut status = PeriodStatus::default();
        status.set(axis, value);
        status
    }

    pub fn set(&mut self, axis: StatusAxis, value: &str) {
        let value = Some(value.to_string());
        match axis {
            StatusAxis::Corporate => self.corporate = value,
            StatusAxis::Market => self.market = value,
            StatusAxis::Personal => self.personal = value,
        }
    }

    pub fn get(&self, axis: StatusAxis) -> Option<&str> {
        match axis {
            StatusAxis::Corporate => self.corporate.as_deref(),
            StatusAxis::Market => self.market.as_deref(),
            StatusAxis::Personal => self.personal.as_deref(),
        }
    }

    /// Overlay `other` on top of self; axes missing in `other` are kept
    pub fn merge(&mut self, other: &PeriodStatus) {
        if other.corporate.is_some() {
            self.corporate = other.corporate.clone();
        }
        if other.market.is_some() {
            self.market = other.market.clone();
        }
        if other.personal.is_some() {
            self.personal = other.personal.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.corporate.is_none() && self.market.is_none() && self.personal.is_none()
    }
}

// ============================================================================
// CARD ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Stable identity (UUID)
    pub id: String,

    /// Owning entrepreneur
    #[serde(rename = "entrepreneurRef")]
    pub entrepreneur_id: String,

    #[serde(rename = "type")]
    pub card_type: CardType,

    /// Masked card number, e.g. "*1234"
    pub number_mask: String,

    /// Latest status, for quick display
    pub status: String,

    /// Free-form note
    pub extra: String,

    /// period label -> status
    pub periods: BTreeMap<String, PeriodStatus>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(entrepreneur_id: &str, card_type: CardType, number_mask: &str, status: &str) -> Self {
        let now = Utc::now();

        Card {
            id: uuid::Uuid::new_v4().to_string(),
            entrepreneur_id: entrepreneur_id.to_string(),
            card_type,
            number_mask: number_mask.trim().to_string(),
            status: status.trim().to_string(),
            extra: String::new(),
            periods: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Status recorded for a period, if any
    pub fn period(&self, label: &str) -> Option<&PeriodStatus> {
        self.periods.get(label)
    }
}

/// Normalize a mask cell: trimmed mask, or None for empty and sentinel cells
pub fn normalize_mask(cell: &str) -> Option<String> {
    let mask = cell.trim();
    if mask.is_empty() || NO_CARD_SENTINELS.contains(&mask) {
        None
    } else {
        Some(mask.to_string())
    }
}

/// Card joined with its owner, as listed by the cards API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardWithOwner {
    #[serde(flatten)]
    pub card: Card,
    pub entrepreneur: super::Entrepreneur,
}

// ============================================================================
// TESTS
// ============================================================================
