//! # Traffic Sign Classifier Interface
//!
//! The classifier produces one activation flag per sign class for each frame it processes. The
//! slots are fixed, see [`SignSlot`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;
use serde::{Serialize, Deserialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of slots in a sign vector.
pub const NUM_SIGN_SLOTS: usize = 7;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Per-frame output of the sign classifier.
///
/// Each slot is either 0 (not detected) or 1 (detected). The default value is the all-zero vector,
/// which is also what the controller uses while the classifier has not produced anything.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Default, Eq, PartialEq)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct SignVector([u8; NUM_SIGN_SLOTS]);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Meaning of each slot of the sign vector.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SignSlot {
    /// Unclassified detection, not used for control
    Unknown = 0,

    /// Turn left ahead
    TurnLeft = 1,

    /// No left turn
    NoLeftTurn = 2,

    /// Turn right ahead
    TurnRight = 3,

    /// No right turn
    NoRightTurn = 4,

    /// Straight ahead, not used for control
    Straight = 5,

    /// Stop or speed limit
    Stop = 6,
}

/// Reasons a sign vector can be rejected.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SignVectorError {
    #[error("Expected {} sign slots, found {0}", NUM_SIGN_SLOTS)]
    InvalidLength(usize),

    #[error("Sign slot {slot} must be 0 or 1, found {value}")]
    InvalidValue { slot: usize, value: u8 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SignSlot {
    /// All slots in vector order.
    pub const ALL: [SignSlot; NUM_SIGN_SLOTS] = [
        SignSlot::Unknown,
        SignSlot::TurnLeft,
        SignSlot::NoLeftTurn,
        SignSlot::TurnRight,
        SignSlot::NoRightTurn,
        SignSlot::Straight,
        SignSlot::Stop,
    ];

    /// Position of this slot in the sign vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Signs which mean the road will turn to the left.
    pub fn indicates_left(self) -> bool {
        matches!(self, SignSlot::TurnLeft | SignSlot::NoRightTurn)
    }

    /// Signs which mean the road will turn to the right.
    pub fn indicates_right(self) -> bool {
        matches!(self, SignSlot::NoLeftTurn | SignSlot::TurnRight)
    }
}

impl SignVector {
    /// Create a new sign vector, checking every slot is 0 or 1.
    pub fn new(slots: [u8; NUM_SIGN_SLOTS]) -> Result<Self, SignVectorError> {
        for (slot, &value) in slots.iter().enumerate() {
            if value > 1 {
                return Err(SignVectorError::InvalidValue { slot, value });
            }
        }

        Ok(Self(slots))
    }

    /// A vector with only the given slots active.
    pub fn with_active(active: &[SignSlot]) -> Self {
        let mut slots = [0u8; NUM_SIGN_SLOTS];
        for slot in active {
            slots[slot.index()] = 1;
        }
        Self(slots)
    }

    /// Raw value of a slot (0 or 1).
    pub fn get(&self, slot: SignSlot) -> u8 {
        self.0[slot.index()]
    }

    /// Returns true if the slot is active.
    pub fn is_active(&self, slot: SignSlot) -> bool {
        self.get(slot) == 1
    }

    /// Returns true if any left-indicating sign is active.
    pub fn left_indicated(&self) -> bool {
        SignSlot::ALL.iter().any(|s| s.indicates_left() && self.is_active(*s))
    }

    /// Returns true if any right-indicating sign is active.
    pub fn right_indicated(&self) -> bool {
        SignSlot::ALL.iter().any(|s| s.indicates_right() && self.is_active(*s))
    }

    /// The raw slots.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for SignVector {
    type Error = SignVectorError;

    fn try_from(slots: &[u8]) -> Result<Self, Self::Error> {
        if slots.len() != NUM_SIGN_SLOTS {
            return Err(SignVectorError::InvalidLength(slots.len()));
        }

        let mut arr = [0u8; NUM_SIGN_SLOTS];
        arr.copy_from_slice(slots);
        Self::new(arr)
    }
}

impl TryFrom<Vec<u8>> for SignVector {
    type Error = SignVectorError;

    fn try_from(slots: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(slots.as_slice())
    }
}

impl From<SignVector> for Vec<u8> {
    fn from(v: SignVector) -> Self {
        v.0.to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validation() {
        assert_eq!(
            SignVector::try_from(vec![0, 0, 0]),
            Err(SignVectorError::InvalidLength(3))
        );
        assert_eq!(
            SignVector::new([0, 0, 2, 0, 0, 0, 0]),
            Err(SignVectorError::InvalidValue { slot: 2, value: 2 })
        );
        assert!(SignVector::try_from(vec![1, 0, 1, 0, 0, 1, 1]).is_ok());
    }

    #[test]
    fn test_direction_groups() {
        for slot in [SignSlot::TurnLeft, SignSlot::NoRightTurn].iter() {
            let v = SignVector::with_active(&[*slot]);
            assert!(v.left_indicated());
            assert!(!v.right_indicated());
        }
        for slot in [SignSlot::NoLeftTurn, SignSlot::TurnRight].iter() {
            let v = SignVector::with_active(&[*slot]);
            assert!(v.right_indicated());
            assert!(!v.left_indicated());
        }

        let v = SignVector::with_active(&[SignSlot::Unknown, SignSlot::Straight, SignSlot::Stop]);
        assert!(!v.left_indicated());
        assert!(!v.right_indicated());
        assert!(v.is_active(SignSlot::Stop));
        assert_eq!(SignVector::default().as_slice(), &[0u8; NUM_SIGN_SLOTS]);
    }

    #[test]
    fn test_json() {
        let v: SignVector = serde_json::from_str("[0, 1, 0, 0, 0, 0, 1]").unwrap();
        assert!(v.is_active(SignSlot::TurnLeft));
        assert!(v.is_active(SignSlot::Stop));
        assert_eq!(serde_json::to_string(&v).unwrap(), "[0,1,0,0,0,0,1]");

        assert!(serde_json::from_str::<SignVector>("[0, 1, 0]").is_err());
        assert!(serde_json::from_str::<SignVector>("[0, 1, 0, 0, 0, 0, 3]").is_err());
    }
}
