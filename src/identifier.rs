// ==============================================================================
// identifier.rs - Individual Identifier Codec
// ==============================================================================
// Description: Splits and joins composite individual IDs (clinic_family_member)
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format:
//   CLN_FAM_1      -> clinic "CLN", family "FAM", member 1
//   CLN_FAM_01_3   -> clinic "CLN", family "FAM_01", member 3
// The clinic is everything before the first separator and the member is
// everything after the last one, so families may contain the separator.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Character joining the three parts of a full individual ID
pub const ID_SEPARATOR: char = '_';

/// Member number conventionally given to the father of a family
pub const FATHER_MEMBER_ID: u32 = 1;

/// Member number conventionally given to the mother of a family
pub const MOTHER_MEMBER_ID: u32 = 2;

/// Errors raised while decoding a full individual ID
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Individual IDs should have 3 parts")]
    Format,

    #[error("Family member identifier must be a number")]
    MemberNotANumber,

    #[error("Invalid family member identifier")]
    MemberOutOfRange,
}

/// Decoded individual identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndividualId {
    pub clinic: String,
    pub family: String,
    pub member: u32,
}

impl IndividualId {
    pub fn new(clinic: impl Into<String>, family: impl Into<String>, member: u32) -> Self {
        Self {
            clinic: clinic.into(),
            family: family.into(),
            member,
        }
    }

    pub fn is_father(&self) -> bool {
        self.member == FATHER_MEMBER_ID
    }

    pub fn is_mother(&self) -> bool {
        self.member == MOTHER_MEMBER_ID
    }
}

impl fmt::Display for IndividualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.clinic,
            self.family,
            self.member,
            sep = ID_SEPARATOR
        )
    }
}

/// Decode a full individual ID into its clinic, family and member parts
///
/// # Returns
/// * `Ok(IndividualId)` - ID had at least two separators and a member >= 1
/// * `Err(IdError::Format)` - fewer than two separators
/// * `Err(IdError::MemberNotANumber)` / `Err(IdError::MemberOutOfRange)` -
///   trailing member segment is not a positive integer
pub fn decode(full_id: &str) -> Result<IndividualId, IdError> {
    if full_id.matches(ID_SEPARATOR).count() < 2 {
        return Err(IdError::Format);
    }

    // Both splits are guaranteed to succeed after the count check
    let (clinic, rest) = full_id.split_once(ID_SEPARATOR).ok_or(IdError::Format)?;
    let (family, member) = rest.rsplit_once(ID_SEPARATOR).ok_or(IdError::Format)?;

    let member: i64 = member.parse().map_err(|_| IdError::MemberNotANumber)?;
    if member < 1 {
        return Err(IdError::MemberOutOfRange);
    }
    let member = u32::try_from(member).map_err(|_| IdError::MemberOutOfRange)?;

    Ok(IndividualId::new(clinic, family, member))
}

/// Join clinic, family and member into a full individual ID
pub fn encode(clinic: &str, family: &str, member: u32) -> String {
    IndividualId::new(clinic, family, member).to_string()
}
