// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Status words returned by the Bitcoin application

use num_enum::TryFromPrimitive;
use strum::Display;

/// Known status words, trailing every device response
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive)]
#[repr(u16)]
pub enum StatusWord {
    /// Command completed successfully
    Ok = 0x9000,
    /// Security status not satisfied (device locked or user refused)
    SecurityStatusNotSatisfied = 0x6982,
    /// Invalid data in the command payload
    IncorrectData = 0x6a80,
    /// Conditions of use not satisfied (user rejected the request)
    ConditionsNotSatisfied = 0x6985,
    /// Not enough memory on the device
    NotEnoughMemory = 0x6a84,
    /// Invalid target id
    InvalidTargetId = 0x6484,
    /// Incorrect P1 or P2
    IncorrectP1P2 = 0x6b00,
    /// Instruction not supported
    InsNotSupported = 0x6d00,
    /// Class not supported
    ClaNotSupported = 0x6e00,
}

impl StatusWord {
    /// Check whether the status word indicates the device is not running
    /// the Bitcoin application
    pub fn is_wrong_application(&self) -> bool {
        matches!(
            self,
            StatusWord::ClaNotSupported | StatusWord::InsNotSupported | StatusWord::IncorrectP1P2
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_words() {
        assert_eq!(StatusWord::try_from(0x9000), Ok(StatusWord::Ok));
        assert_eq!(
            StatusWord::try_from(0x6985),
            Ok(StatusWord::ConditionsNotSatisfied)
        );
        assert!(StatusWord::try_from(0x6f00).is_err());
    }

    #[test]
    fn wrong_application() {
        for sw in [0x6e00u16, 0x6d00, 0x6b00] {
            assert!(StatusWord::try_from(sw).unwrap().is_wrong_application());
        }

        assert!(!StatusWord::IncorrectData.is_wrong_application());
        assert!(!StatusWord::Ok.is_wrong_application());
    }
}
