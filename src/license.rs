//! The license bean: the signed payload of a license key.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

fn one() -> i64 {
    1
}

fn is_one(amount: &i64) -> bool {
    *amount == 1
}

/// A value object defining the common properties of any license.
///
/// All properties start unset; license initialization fills the required
/// defaults before a key is generated, and license validation may fail when
/// required properties are still unset at install or verify time.
///
/// Equality covers all fields. Date fields are `Copy`, so reading one always
/// yields an independent value which cannot be used to mutate the license.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    /// The license management subject, e.g. `"MyApp 1.X"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Distinguished name of the legal entity the license is granted to,
    /// typically the consumer, e.g. `"CN=Unknown"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,

    /// Distinguished name of the legal entity granting the license,
    /// typically the vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// When the license was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<DateTime<Utc>>,

    /// Start of the validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// End of the validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,

    /// Type of the entity consuming the license, e.g. `"User"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_type: Option<String>,

    /// How many consumers may use the subject. Defaults to one on the wire
    /// so the common case doesn't need to get encoded.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub consumer_amount: i64,

    /// Free-form information displayed to users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    /// Opaque extra payload for custom validation; never shown to users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl License {
    /// Create a license with all properties unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute `issued`, `not_before` and `not_after` from a validity period
    /// in days from now.
    ///
    /// Depends on the system clock unless `issued` is already set; that is
    /// acceptable here because this convenience is used on the vendor side
    /// only, never for initialization or validation by a consumer manager.
    pub fn set_term(&mut self, days: i64) {
        let issued = *self.issued.get_or_insert_with(Utc::now);
        self.not_before = Some(issued);
        self.not_after = Some(issued + Duration::days(days));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn consumer_amount_defaults_to_one_on_the_wire() {
        let license: License = serde_json::from_str("{}").unwrap();
        assert_eq!(license.consumer_amount, 1);

        let mut license = License::new();
        license.consumer_amount = 1;
        assert_eq!(serde_json::to_string(&license).unwrap(), "{}");
    }

    #[test]
    fn fresh_license_has_amount_zero_until_initialized() {
        assert_eq!(License::new().consumer_amount, 0);
    }

    #[test]
    fn wire_round_trip_preserves_all_fields() {
        let mut license = License::new();
        license.subject = Some("MyApp 1.X".to_string());
        license.holder = Some("CN=Jane Doe".to_string());
        license.issuer = Some("CN=MyApp".to_string());
        license.issued = Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap());
        license.consumer_type = Some("User".to_string());
        license.consumer_amount = 5;
        license.info = Some("site license".to_string());
        license.extra = Some(serde_json::json!({"tier": "pro"}));
        license.set_term(30);

        let json = serde_json::to_string(&license).unwrap();
        let back: License = serde_json::from_str(&json).unwrap();
        assert_eq!(back, license);
    }

    #[test]
    fn set_term_anchors_the_window_on_issued() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let mut license = License::new();
        license.issued = Some(issued);
        license.set_term(30);
        assert_eq!(license.not_before, Some(issued));
        assert_eq!(license.not_after, Some(issued + Duration::days(30)));
    }

    #[test]
    fn reading_a_date_yields_an_independent_copy() {
        let issued = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let mut license = License::new();
        license.issued = Some(issued);

        let mut copy = license.issued.unwrap();
        copy = copy + Duration::days(365);
        let _ = copy;
        assert_eq!(license.issued, Some(issued));
    }
}
