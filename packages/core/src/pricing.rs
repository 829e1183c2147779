//! Recommended slot prices from reach, category CPM and engagement.
//!
//! All arithmetic runs on integers with a single truncation at the end, so
//! `10000 × 1.2` is exactly `12000` rather than a float that truncates to
//! `11999`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Channel, PlacementFormat};

/// CPM used when a category has no configured value
pub const DEFAULT_CPM: i64 = 1000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("Reach must not be negative: {0}")]
    NegativeReach(i64),

    #[error("Engagement rate must be within 0-100 percent: {0}")]
    InvalidEngagementRate(f64),

    #[error("CPM must be positive: {0}")]
    InvalidCpm(i64),

    #[error("Invalid CPM for category {category}: {cpm}")]
    InvalidCategoryCpm { category: String, cpm: i64 },
}

/// Validated category → CPM mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, i64>", into = "HashMap<String, i64>")]
pub struct CategoryCpm {
    rates: HashMap<String, i64>,
}

impl CategoryCpm {
    pub fn new(rates: HashMap<String, i64>) -> Result<Self, PricingError> {
        let mut normalized = HashMap::with_capacity(rates.len());
        for (category, cpm) in rates {
            if cpm <= 0 {
                return Err(PricingError::InvalidCategoryCpm { category, cpm });
            }
            normalized.insert(category.trim().to_lowercase(), cpm);
        }
        Ok(Self { rates: normalized })
    }

    /// Configured CPM for the category, or [`DEFAULT_CPM`]
    pub fn cpm_for(&self, category: &str) -> i64 {
        self.rates
            .get(&category.trim().to_lowercase())
            .copied()
            .unwrap_or(DEFAULT_CPM)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl TryFrom<HashMap<String, i64>> for CategoryCpm {
    type Error = PricingError;

    fn try_from(value: HashMap<String, i64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CategoryCpm> for HashMap<String, i64> {
    fn from(value: CategoryCpm) -> Self {
        value.rates
    }
}

#[derive(Debug, Clone)]
pub struct PriceRequest<'a> {
    pub reach: i64,
    pub category: &'a str,
    pub err_percent: f64,
    /// Format label such as `1/24` or `native`; unknown labels price as 1/24
    pub format: &'a str,
    pub cpm_override: Option<i64>,
}

/// Engagement surcharge in percent. No stacking.
pub fn engagement_surcharge_percent(err_percent: f64) -> i64 {
    if err_percent > 20.0 {
        120
    } else if err_percent > 15.0 {
        110
    } else {
        100
    }
}

pub fn format_multiplier_percent(format: &str) -> i64 {
    format
        .parse::<PlacementFormat>()
        .map(|format| format.multiplier_percent())
        .unwrap_or(100)
}

pub fn recommend(request: &PriceRequest<'_>, categories: &CategoryCpm) -> Result<i64, PricingError> {
    if request.reach < 0 {
        return Err(PricingError::NegativeReach(request.reach));
    }
    if !request.err_percent.is_finite() || !(0.0..=100.0).contains(&request.err_percent) {
        return Err(PricingError::InvalidEngagementRate(request.err_percent));
    }

    let cpm = match request.cpm_override {
        Some(cpm) if cpm <= 0 => return Err(PricingError::InvalidCpm(cpm)),
        Some(cpm) => cpm,
        None => categories.cpm_for(request.category),
    };

    let surcharge = engagement_surcharge_percent(request.err_percent);
    let multiplier = format_multiplier_percent(request.format);

    let numerator = i128::from(request.reach)
        * i128::from(cpm)
        * i128::from(surcharge)
        * i128::from(multiplier);
    let price = numerator / (1000 * 100 * 100);

    Ok(i64::try_from(price).unwrap_or(i64::MAX))
}

impl Channel {
    /// Recommended price for `format` from this channel's own analytics snapshot
    pub fn recommended_price(
        &self,
        format: PlacementFormat,
        categories: &CategoryCpm,
        cpm_override: Option<i64>,
    ) -> Result<i64, PricingError> {
        recommend(
            &PriceRequest {
                reach: self.analytics.reach_24h,
                category: &self.category,
                err_percent: self.analytics.err_percent,
                format: format.as_str(),
                cpm_override,
            },
            categories,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> CategoryCpm {
        CategoryCpm::new(HashMap::from([
            ("news".to_string(), 1000),
            ("crypto".to_string(), 2500),
        ]))
        .unwrap()
    }

    fn request<'a>(err_percent: f64, format: &'a str) -> PriceRequest<'a> {
        PriceRequest {
            reach: 10_000,
            category: "news",
            err_percent,
            format,
            cpm_override: None,
        }
    }

    #[test]
    fn test_price_determinism() {
        let categories = categories();
        assert_eq!(recommend(&request(10.0, "1/24"), &categories).unwrap(), 10_000);
        assert_eq!(recommend(&request(25.0, "1/24"), &categories).unwrap(), 12_000);
        assert_eq!(recommend(&request(10.0, "native"), &categories).unwrap(), 25_000);
    }

    #[test]
    fn test_engagement_thresholds() {
        assert_eq!(engagement_surcharge_percent(15.0), 100);
        assert_eq!(engagement_surcharge_percent(15.01), 110);
        assert_eq!(engagement_surcharge_percent(20.0), 110);
        assert_eq!(engagement_surcharge_percent(20.01), 120);
        assert_eq!(engagement_surcharge_percent(100.0), 120);
    }

    #[test]
    fn test_format_multipliers() {
        let categories = categories();
        assert_eq!(recommend(&request(0.0, "1/48"), &categories).unwrap(), 8_000);
        assert_eq!(recommend(&request(0.0, "2/48"), &categories).unwrap(), 16_000);
        assert_eq!(recommend(&request(0.0, "3/72"), &categories).unwrap(), 10_000);
    }

    #[test]
    fn test_cpm_sources() {
        let categories = categories();

        let mut req = request(0.0, "1/24");
        req.category = "crypto";
        assert_eq!(recommend(&req, &categories).unwrap(), 25_000);

        req.category = "unknown";
        assert_eq!(recommend(&req, &categories).unwrap(), 10_000);

        req.cpm_override = Some(300);
        assert_eq!(recommend(&req, &categories).unwrap(), 3_000);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let categories = categories();
        let req = PriceRequest {
            reach: 1_234,
            category: "news",
            err_percent: 18.0,
            format: "1/48",
            cpm_override: Some(777),
        };
        // 1234 * 777 / 1000 = 958.818; * 1.1 * 0.8 = 843.75984
        assert_eq!(recommend(&req, &categories).unwrap(), 843);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let categories = categories();

        let mut req = request(10.0, "1/24");
        req.reach = -1;
        assert_eq!(
            recommend(&req, &categories),
            Err(PricingError::NegativeReach(-1))
        );

        assert!(matches!(
            recommend(&request(120.0, "1/24"), &categories),
            Err(PricingError::InvalidEngagementRate(_))
        ));

        let mut req = request(10.0, "1/24");
        req.cpm_override = Some(0);
        assert_eq!(recommend(&req, &categories), Err(PricingError::InvalidCpm(0)));
    }

    #[test]
    fn test_category_table_validation() {
        let err = CategoryCpm::new(HashMap::from([("spam".to_string(), 0)])).unwrap_err();
        assert!(matches!(err, PricingError::InvalidCategoryCpm { .. }));

        let table: CategoryCpm = serde_json::from_str(r#"{"News": 1500}"#).unwrap();
        assert_eq!(table.cpm_for("news"), 1500);
        assert!(serde_json::from_str::<CategoryCpm>(r#"{"news": -5}"#).is_err());
    }
}
