//! Credit pricing and refund decisions.
//!
//! Premium processing is charged per photo at batch submission; a photo
//! with no bib detected earns its credits back. The rules live here so the
//! ledger repository and the pipeline reconciler share one definition.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default price of premium processing for one photo.
pub const DEFAULT_CREDITS_PER_PHOTO: i32 = 3;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Processing tier chosen per batch. Standard runs bib OCR only and is
/// free; premium runs the full pipeline and is charged per photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingTier {
    Standard,
    Premium,
}

impl ProcessingTier {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Premium)
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Total cost of a batch: photo count times per-photo price for premium,
/// zero for standard.
pub fn batch_cost(tier: ProcessingTier, photo_count: usize, credits_per_photo: i32) -> i32 {
    match tier {
        ProcessingTier::Standard => 0,
        ProcessingTier::Premium => photo_count as i32 * credits_per_photo,
    }
}

/// Whether a photo has earned a refund: its batch was charged, it has not
/// been refunded before, and OCR recorded no bib numbers.
pub fn refund_due(credit_deducted: bool, credit_refunded: bool, bib_count: usize) -> bool {
    credit_deducted && !credit_refunded && bib_count == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- batch_cost -----------------------------------------------------------

    #[test]
    fn standard_batches_are_free() {
        assert_eq!(batch_cost(ProcessingTier::Standard, 25, 3), 0);
    }

    #[test]
    fn premium_batches_charge_per_photo() {
        assert_eq!(batch_cost(ProcessingTier::Premium, 10, 3), 30);
        assert_eq!(batch_cost(ProcessingTier::Premium, 0, 3), 0);
    }

    // -- refund_due -----------------------------------------------------------

    #[test]
    fn refund_only_when_charged_unrefunded_and_bibless() {
        assert!(refund_due(true, false, 0));
        assert!(!refund_due(true, false, 2));
        assert!(!refund_due(true, true, 0));
        assert!(!refund_due(false, false, 0));
    }

    // -- ProcessingTier -------------------------------------------------------

    #[test]
    fn tier_parse_round_trips() {
        for tier in [ProcessingTier::Standard, ProcessingTier::Premium] {
            assert_eq!(ProcessingTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(ProcessingTier::parse("deluxe"), None);
    }
}
