//! Referral registry
//!
//! Records who referred whom. Each referred user has at most one referral
//! on record, and the referral reward fires at most once; the `rewarded`
//! flag makes `reward_referrer` idempotent.

use crate::types::{MarketError, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One referrer → referred relationship
#[derive(Debug, Clone, PartialEq)]
pub struct Referral {
    /// The user who referred
    pub referrer: UserId,
    /// The user who was referred
    pub referred: UserId,
    /// Whether the one-time reward has been paid
    pub rewarded: bool,
    /// When the referral was applied
    pub created_at: DateTime<Utc>,
}

/// Registry of referrals, keyed by the referred user
pub struct ReferralBook {
    referrals: HashMap<UserId, Referral>,
}

impl ReferralBook {
    /// Create a new, empty registry
    pub fn new() -> Self {
        ReferralBook {
            referrals: HashMap::new(),
        }
    }

    /// Apply a referral for a newly registered user
    ///
    /// # Errors
    ///
    /// Returns `ReferralExists` if the referred user already has a referral.
    pub(crate) fn apply(
        &mut self,
        referrer: UserId,
        referred: UserId,
        now: DateTime<Utc>,
    ) -> Result<&Referral, MarketError> {
        if self.referrals.contains_key(&referred) {
            return Err(MarketError::ReferralExists { referred });
        }
        Ok(self.referrals.entry(referred).or_insert(Referral {
            referrer,
            referred,
            rewarded: false,
            created_at: now,
        }))
    }

    /// Look up the referral recorded for a referred user
    pub fn for_referred(&self, referred: UserId) -> Option<&Referral> {
        self.referrals.get(&referred)
    }

    /// All referrals made by one referrer
    pub fn made_by(&self, referrer: UserId) -> Vec<&Referral> {
        let mut result: Vec<&Referral> = self
            .referrals
            .values()
            .filter(|r| r.referrer == referrer)
            .collect();
        result.sort_by_key(|r| r.referred);
        result
    }

    /// Mark the referred user's referral as rewarded
    pub(crate) fn mark_rewarded(&mut self, referred: UserId) {
        if let Some(referral) = self.referrals.get_mut(&referred) {
            referral.rewarded = true;
        }
    }
}

impl Default for ReferralBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_records_relationship() {
        let mut book = ReferralBook::new();
        book.apply(1, 2, Utc::now()).unwrap();

        let referral = book.for_referred(2).unwrap();
        assert_eq!(referral.referrer, 1);
        assert!(!referral.rewarded);
    }

    #[test]
    fn test_second_referral_rejected() {
        let mut book = ReferralBook::new();
        book.apply(1, 2, Utc::now()).unwrap();

        let result = book.apply(3, 2, Utc::now());
        assert!(matches!(
            result,
            Err(MarketError::ReferralExists { referred: 2 })
        ));
        // first referral unchanged
        assert_eq!(book.for_referred(2).unwrap().referrer, 1);
    }

    #[test]
    fn test_mark_rewarded_flips_flag_once() {
        let mut book = ReferralBook::new();
        book.apply(1, 2, Utc::now()).unwrap();

        book.mark_rewarded(2);
        assert!(book.for_referred(2).unwrap().rewarded);

        // marking again is harmless
        book.mark_rewarded(2);
        assert!(book.for_referred(2).unwrap().rewarded);
    }

    #[test]
    fn test_made_by_lists_referrers_referrals() {
        let mut book = ReferralBook::new();
        book.apply(1, 2, Utc::now()).unwrap();
        book.apply(1, 3, Utc::now()).unwrap();
        book.apply(4, 5, Utc::now()).unwrap();

        let made = book.made_by(1);
        assert_eq!(made.len(), 2);
        assert_eq!(made[0].referred, 2);
        assert_eq!(made[1].referred, 3);
    }
}
