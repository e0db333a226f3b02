//! Identifier shape checks.
//!
//! A component identifier is 6 to 18 decimal digits with no leading zero.
//! The two digits before the final check digit form the partition
//! identifier: the first is `0` (short format) or `1` (namespaced), the
//! second names the component kind. The final digit is a Verhoeff check
//! digit; verifying it is optional.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::GraphError;

pub const MIN_LENGTH: usize = 6;
pub const MAX_LENGTH: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    Concept,
    Description,
    Relationship,
}

impl Partition {
    fn digit(self) -> u8 {
        match self {
            Partition::Concept => 0,
            Partition::Description => 1,
            Partition::Relationship => 2,
        }
    }

    fn from_digit(d: u8) -> Option<Self> {
        match d {
            0 => Some(Partition::Concept),
            1 => Some(Partition::Description),
            2 => Some(Partition::Relationship),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Partition::Concept => "concept",
            Partition::Description => "description",
            Partition::Relationship => "relationship",
        }
    }
}

/// What to do with an identifier that fails the shape checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierPolicy {
    /// Reject malformed identifiers.
    Strict,
    /// Log and proceed with the numeric value.
    #[default]
    Lenient,
}

const D: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

const P: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 7, 0, 6, 8],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

const INV: [u8; 10] = [0, 4, 3, 2, 1, 5, 6, 7, 8, 9];

fn verhoeff_accumulate(digits: &[u8], offset: usize) -> u8 {
    digits
        .iter()
        .rev()
        .enumerate()
        .fold(0u8, |c, (i, &d)| D[c as usize][P[(i + offset) % 8][d as usize] as usize])
}

/// True when the final digit of `digits` is a valid Verhoeff check digit.
pub fn verhoeff_valid(digits: &[u8]) -> bool {
    !digits.is_empty() && verhoeff_accumulate(digits, 0) == 0
}

/// Build a short-format identifier from an item number, appending the
/// partition digits and the Verhoeff check digit.
pub fn sctid_for(item: u64, partition: Partition) -> u64 {
    let body = format!("{item}0{}", partition.digit());
    let digits: Vec<u8> = body.bytes().map(|b| b - b'0').collect();
    let check = INV[verhoeff_accumulate(&digits, 1) as usize];
    format!("{body}{check}").parse().unwrap_or(0)
}

/// Check identifier shape. Returns the numeric identifier.
pub fn validate_sctid(
    raw: &str,
    expected: Option<Partition>,
    verify_check_digit: bool,
) -> Result<u64, GraphError> {
    let malformed = |reason: String| GraphError::MalformedIdentifier {
        id: raw.to_string(),
        reason,
    };

    if raw.len() < MIN_LENGTH || raw.len() > MAX_LENGTH {
        return Err(malformed(format!(
            "length {} outside {MIN_LENGTH}..={MAX_LENGTH}",
            raw.len()
        )));
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("non-digit characters".to_string()));
    }
    if raw.starts_with('0') {
        return Err(malformed("leading zero".to_string()));
    }

    let digits: Vec<u8> = raw.bytes().map(|b| b - b'0').collect();
    let n = digits.len();
    let format_digit = digits[n - 3];
    let kind_digit = digits[n - 2];
    if format_digit > 1 {
        return Err(malformed(format!("invalid partition format digit {format_digit}")));
    }
    let Some(partition) = Partition::from_digit(kind_digit) else {
        return Err(malformed(format!("unknown partition digit {kind_digit}")));
    };
    if let Some(expected) = expected {
        if partition != expected {
            return Err(malformed(format!(
                "partition is {} but a {} identifier was expected",
                partition.name(),
                expected.name()
            )));
        }
    }
    if verify_check_digit && !verhoeff_valid(&digits) {
        return Err(malformed("check digit mismatch".to_string()));
    }

    raw.parse::<u64>()
        .map_err(|e| malformed(format!("not a 64-bit number: {e}")))
}

/// Partition of a numeric identifier, if its shape allows one.
pub fn partition_of(id: u64) -> Option<Partition> {
    let s = id.to_string();
    if s.len() < MIN_LENGTH {
        return None;
    }
    let kind = s.as_bytes()[s.len() - 2] - b'0';
    Partition::from_digit(kind)
}

/// Refset members and axioms are keyed by UUID.
pub fn parse_member_id(raw: &str) -> Result<Uuid, GraphError> {
    Uuid::parse_str(raw).map_err(|e| GraphError::MalformedIdentifier {
        id: raw.to_string(),
        reason: format!("invalid UUID: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identifiers_pass_the_check_digit() {
        for item in [1u64, 42, 10_000, 987_654_321] {
            for partition in [Partition::Concept, Partition::Description, Partition::Relationship] {
                let id = sctid_for(item, partition);
                let validated = validate_sctid(&id.to_string(), Some(partition), true).unwrap();
                assert_eq!(validated, id);
                assert_eq!(partition_of(id), Some(partition));
            }
        }
    }

    #[test]
    fn shape_violations() {
        assert!(validate_sctid("12345", None, false).is_err());
        assert!(validate_sctid("0100005", None, false).is_err());
        assert!(validate_sctid("10a005", None, false).is_err());
        assert!(validate_sctid("100035", None, false).is_err());
        assert!(validate_sctid("100205", None, false).is_err());
        assert!(validate_sctid("1234567890123456789", None, false).is_err());
    }

    #[test]
    fn partition_mismatch_is_reported() {
        let err = validate_sctid("100005", Some(Partition::Description), false).unwrap_err();
        assert!(matches!(err, GraphError::MalformedIdentifier { .. }));
        assert_eq!(validate_sctid("100005", Some(Partition::Concept), false), Ok(100005));
    }

    #[test]
    fn check_digit_is_optional() {
        let good = sctid_for(123, Partition::Concept);
        let bad = good - good % 10 + (good % 10 + 1) % 10;
        assert!(validate_sctid(&bad.to_string(), None, false).is_ok());
        assert!(validate_sctid(&bad.to_string(), None, true).is_err());
    }

    #[test]
    fn member_ids_are_uuids() {
        assert!(parse_member_id("8b6b5b1f-2cc4-4a0b-9cd6-a4f3c3a08c7e").is_ok());
        assert!(parse_member_id("not-a-uuid").is_err());
    }
}
