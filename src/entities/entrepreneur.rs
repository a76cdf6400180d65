// 🧾 Entrepreneur Entity ("ИП") - a registered individual business
//
// Identity is the UUID; (name, region) is the natural key the importer
// uses for find-or-create.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrepreneur {
    /// Stable identity (UUID)
    pub id: String,

    /// Display name, e.g. "ИП Шевченко"
    pub name: String,

    /// Region the entrepreneur operates in
    pub region: String,

    /// Tax id (ИНН), empty when unknown
    pub inn: String,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entrepreneur {
    /// Create a new active entrepreneur; name and region are trimmed
    pub fn new(name: &str, region: &str) -> Self {
        let now = Utc::now();

        Entrepreneur {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            region: region.trim().to_string(),
            inn: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Entrepreneur together with its cards (utils/ips-with-cards)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrepreneurWithCards {
    #[serde(flatten)]
    pub entrepreneur: Entrepreneur,
    pub cards: Vec<super::Card>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_and_defaults() {
        let ip = Entrepreneur::new("  ИП Ш ", " Region1");

        assert_eq!(ip.name, "ИП Ш");
        assert_eq!(ip.region, "Region1");
        assert!(ip.is_active);
        assert!(ip.inn.is_empty());
        assert_eq!(ip.id.len(), 36);
    }

    #[test]
    fn test_serializes_camel_case() {
        let ip = Entrepreneur::new("ИП Т", "Region1");
        let json = serde_json::to_value(&ip).unwrap();

        assert_eq!(json["name"], "ИП Т");
        assert_eq!(json["isActive"], true);
        assert!(json.get("createdAt").is_some());
    }
}
