//! Pricing catalog for creditbook.
//!
//! Maps plans, credit packages, features and referral rewards to credit
//! amounts. The catalog is plain data: it can be loaded from JSON and falls
//! back to the built-in defaults.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{LedgerError, Plan, Result};

/// Message shown whenever a user runs out of credits.
pub const INSUFFICIENT_CREDITS_MESSAGE: &str =
    "Not enough credits. Upgrade your plan or purchase more credits to continue.";

/// Referral reward identifiers.
pub struct ReferralReward;

impl ReferralReward {
    /// Reward for inviting a friend who signs up.
    pub const INVITE_FRIEND: &'static str = "inviteFriend";
    /// Reward for submitting product feedback.
    pub const SUBMIT_FEEDBACK: &'static str = "submitFeedback";
}

/// Pricing configuration for all credit-bearing items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingCatalog {
    /// Plan allocations and prices.
    pub plans: HashMap<Plan, PlanPricing>,

    /// One-time credit packages, keyed by package ID.
    pub packages: HashMap<String, CreditPackage>,

    /// Credit cost per unit of each feature, keyed by feature ID.
    pub feature_costs: HashMap<String, f64>,

    /// Fixed referral rewards, keyed by reward type.
    pub referral_rewards: HashMap<String, i64>,
}

/// Allocation and price of a subscription plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanPricing {
    /// Display name.
    pub name: String,
    /// Credits granted when the plan is applied.
    pub monthly_credits: i64,
    /// Monthly price in minor currency units.
    pub price_minor: i64,
    /// ISO currency code.
    pub currency: String,
}

/// A one-time credit package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPackage {
    /// Credits granted on purchase.
    pub credits: i64,
    /// Price in minor currency units.
    pub price_minor: i64,
    /// ISO currency code.
    pub currency: String,
}

impl Default for PricingCatalog {
    fn default() -> Self {
        let plan = |name: &str, monthly_credits, price_minor| PlanPricing {
            name: name.to_string(),
            monthly_credits,
            price_minor,
            currency: "INR".to_string(),
        };
        let plans = HashMap::from([
            (Plan::Free, plan("Free", 100, 0)),
            (Plan::Starter, plan("Starter", 500, 49_900)),
            (Plan::Pro, plan("Pro", 1000, 99_900)),
            (Plan::Business, plan("Business", 2000, 199_900)),
        ]);

        let package = |credits, price_minor| CreditPackage {
            credits,
            price_minor,
            currency: "INR".to_string(),
        };
        let packages = HashMap::from([
            ("small".to_string(), package(100, 9_900)),
            ("medium".to_string(), package(500, 44_900)),
            ("large".to_string(), package(1000, 79_900)),
        ]);

        let feature_costs = [
            ("contentGeneration", 1.0),
            ("captionGeneration", 0.5),
            ("hashtagGeneration", 0.25),
            ("imageGeneration", 5.0),
            ("thumbnailGeneration", 2.0),
            ("video", 50.0),
        ]
        .into_iter()
        .map(|(feature, cost)| (feature.to_string(), cost))
        .collect();

        let referral_rewards = HashMap::from([
            (ReferralReward::INVITE_FRIEND.to_string(), 50),
            (ReferralReward::SUBMIT_FEEDBACK.to_string(), 10),
        ]);

        Self {
            plans,
            packages,
            feature_costs,
            referral_rewards,
        }
    }
}

impl PricingCatalog {
    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Configuration` if the file cannot be read or
    /// parsed, or if it fails [`validate`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let catalog: Self = serde_json::from_str(&contents).map_err(|e| {
            LedgerError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check that plan allocations are non-negative and that packages, feature
    /// costs and rewards are positive.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Configuration` naming the first bad entry.
    pub fn validate(&self) -> Result<()> {
        if let Some((plan, _)) = self.plans.iter().find(|(_, p)| p.monthly_credits < 0) {
            return Err(LedgerError::Configuration(format!(
                "plan {plan} has a negative allocation"
            )));
        }
        if let Some((id, _)) = self.packages.iter().find(|(_, p)| p.credits <= 0) {
            return Err(LedgerError::Configuration(format!(
                "package {id} must grant a positive number of credits"
            )));
        }
        if let Some((feature, _)) = self
            .feature_costs
            .iter()
            .find(|(_, cost)| !cost.is_finite() || **cost <= 0.0)
        {
            return Err(LedgerError::Configuration(format!(
                "feature {feature} must cost a positive number of credits"
            )));
        }
        if let Some((reward, _)) = self.referral_rewards.iter().find(|(_, a)| **a <= 0) {
            return Err(LedgerError::Configuration(format!(
                "referral reward {reward} must be positive"
            )));
        }
        Ok(())
    }

    /// Credit allocation for a plan.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownPlan` if the plan is not priced.
    pub fn plan(&self, plan: Plan) -> Result<&PlanPricing> {
        self.plans.get(&plan).ok_or_else(|| LedgerError::UnknownPlan {
            plan: plan.to_string(),
        })
    }

    /// Look up a credit package.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownPackage` if the package does not exist.
    pub fn package(&self, package_id: &str) -> Result<&CreditPackage> {
        self.packages
            .get(package_id)
            .ok_or_else(|| LedgerError::UnknownPackage {
                package: package_id.to_string(),
            })
    }

    /// Unit cost of a feature.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownFeature` if the feature is not priced.
    pub fn unit_cost(&self, feature: &str) -> Result<f64> {
        self.feature_costs
            .get(feature)
            .copied()
            .ok_or_else(|| LedgerError::UnknownFeature {
                feature: feature.to_string(),
            })
    }

    /// Total credit cost of using a feature `quantity` times, rounded up to a
    /// whole credit.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownFeature` for an unpriced feature and
    /// `LedgerError::InvalidAmount` if the total does not fit in a balance.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn credit_cost(&self, feature: &str, quantity: u32) -> Result<i64> {
        let total = (self.unit_cost(feature)? * f64::from(quantity)).ceil();
        if total > i64::MAX as f64 {
            return Err(LedgerError::InvalidAmount(format!(
                "cost of {quantity} x {feature} overflows"
            )));
        }
        Ok(total as i64)
    }

    /// Fixed reward for a referral action, if one is configured.
    #[must_use]
    pub fn referral_reward(&self, reward: &str) -> Option<i64> {
        self.referral_rewards.get(reward).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        PricingCatalog::default().validate().unwrap();
    }

    #[test]
    fn plan_allocations() {
        let catalog = PricingCatalog::default();
        assert_eq!(catalog.plan(Plan::Free).unwrap().monthly_credits, 100);
        assert_eq!(catalog.plan(Plan::Pro).unwrap().monthly_credits, 1000);
        assert_eq!(catalog.plan(Plan::Business).unwrap().monthly_credits, 2000);
    }

    #[test]
    fn missing_plan_is_unknown() {
        let mut catalog = PricingCatalog::default();
        catalog.plans.remove(&Plan::Starter);

        let err = catalog.plan(Plan::Starter).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownPlan { plan } if plan == "starter"));
    }

    #[test]
    fn credit_cost_rounds_up() {
        let catalog = PricingCatalog::default();

        assert_eq!(catalog.credit_cost("imageGeneration", 1).unwrap(), 5);
        assert_eq!(catalog.credit_cost("captionGeneration", 3).unwrap(), 2);
        assert_eq!(catalog.credit_cost("hashtagGeneration", 1).unwrap(), 1);
        assert_eq!(catalog.credit_cost("video", 0).unwrap(), 0);
    }

    #[test]
    fn credit_cost_unknown_feature() {
        let catalog = PricingCatalog::default();
        let err = catalog.credit_cost("teleportation", 1).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownFeature { feature } if feature == "teleportation"));
    }

    #[test]
    fn referral_rewards() {
        let catalog = PricingCatalog::default();
        assert_eq!(catalog.referral_reward(ReferralReward::INVITE_FRIEND), Some(50));
        assert_eq!(catalog.referral_reward(ReferralReward::SUBMIT_FEEDBACK), Some(10));
        assert_eq!(catalog.referral_reward("writeReview"), None);
    }

    #[test]
    fn validate_rejects_negative_cost() {
        let mut catalog = PricingCatalog::default();
        catalog.feature_costs.insert("broken".into(), -1.0);
        assert!(matches!(
            catalog.validate(),
            Err(LedgerError::Configuration(_))
        ));
    }

    #[test]
    fn catalog_loads_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pricing.json");
        let json = serde_json::json!({
            "plans": {
                "free": { "name": "Free", "monthly_credits": 25, "price_minor": 0, "currency": "USD" }
            },
            "packages": {},
            "feature_costs": { "imageGeneration": 3.0 },
            "referral_rewards": {}
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let catalog = PricingCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.plan(Plan::Free).unwrap().monthly_credits, 25);
        assert!(catalog.plan(Plan::Pro).is_err());
        assert_eq!(catalog.credit_cost("imageGeneration", 2).unwrap(), 6);
    }
}
