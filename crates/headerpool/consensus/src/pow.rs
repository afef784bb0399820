//! Proof-of-work target
//!
//! A header is a valid solution iff its id, read as a big-endian 256-bit
//! integer, is strictly below the target. Difficulty is the inverse view:
//! `target = U256::MAX / difficulty`.

use alloy_primitives::U256;
use std::fmt;

use crate::{BlockId, ConsensusError, Header};

/// Difficulty threshold for header ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(U256);

impl Target {
    /// Target every id except `U256::MAX` satisfies
    pub const MAX: Self = Self(U256::MAX);

    /// Wrap a raw threshold
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Convert difficulty to target
    pub fn from_difficulty(difficulty: U256) -> Self {
        if difficulty == U256::ZERO {
            return Self::MAX;
        }
        Self(U256::MAX / difficulty)
    }

    /// Convert target to difficulty
    pub fn difficulty(&self) -> U256 {
        if self.0 == U256::ZERO {
            return U256::MAX;
        }
        U256::MAX / self.0
    }

    /// Raw threshold
    pub const fn value(&self) -> U256 {
        self.0
    }

    /// Check whether `id` satisfies this target
    pub fn is_met_by(&self, id: &BlockId) -> bool {
        id.to_u256() < self.0
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::MAX
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#066x}", self.0)
    }
}

/// Verify a header's proof of work against `target`
pub fn verify_pow(header: &Header, target: &Target) -> Result<(), ConsensusError> {
    let id = header.id();
    if !target.is_met_by(&id) {
        return Err(ConsensusError::TargetNotMet { id, target: *target });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, B64};
    use proptest::prelude::*;

    #[test]
    fn test_difficulty_conversion() {
        let difficulty = U256::from(1_000_000u64);
        let target = Target::from_difficulty(difficulty);
        let back = target.difficulty();

        // Should be approximately equal (some rounding)
        let diff = if back > difficulty { back - difficulty } else { difficulty - back };
        assert!(diff < U256::from(1000u64));
    }

    #[test]
    fn test_zero_difficulty_is_max_target() {
        assert_eq!(Target::from_difficulty(U256::ZERO), Target::MAX);
        assert_eq!(Target::new(U256::ZERO).difficulty(), U256::MAX);
    }

    #[test]
    fn test_target_is_strict() {
        let id = BlockId(B256::with_last_byte(5));
        assert!(!Target::new(U256::from(5u64)).is_met_by(&id));
        assert!(Target::new(U256::from(6u64)).is_met_by(&id));
    }

    #[test]
    fn test_verify_pow() {
        let header = Header::default();
        assert!(verify_pow(&header, &Target::MAX).is_ok());

        let impossible = Target::new(U256::ZERO);
        assert_eq!(
            verify_pow(&header, &impossible),
            Err(ConsensusError::TargetNotMet { id: header.id(), target: impossible })
        );
    }

    proptest! {
        #[test]
        fn proptest_easier_target_accepts_superset(
            nonce in any::<u64>(),
            low in 1u64..u64::MAX,
        ) {
            let header = Header::default().with_nonce(B64::new(nonce.to_be_bytes()));
            let id = header.id();
            let hard = Target::from_difficulty(U256::from(low).saturating_add(U256::from(1u64)));
            let easy = Target::from_difficulty(U256::from(low));
            prop_assert!(hard <= easy);
            if hard.is_met_by(&id) {
                prop_assert!(easy.is_met_by(&id));
            }
        }
    }
}
