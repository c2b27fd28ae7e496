/// Pre-check status codes a consensus node can return before consensus is
/// reached. Decoding the raw integer into one of these is
/// `Execute::precheck_status`'s job; anything outside the closed set this
/// crate recognizes classifies as `Unrecognized` rather than `Other`, per
/// the distinction between "a known-but-unhandled failure" and "the server
/// sent a code that doesn't exist in this protocol version".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecheckStatus {
    Ok,
    Busy,
    PlatformNotActive,
    TransactionExpired,
    /// Any other code in the known range -- fatal unless the request opts
    /// into retrying it via `should_retry_pre_check`.
    Other(i32),
}

/// Codes above this value (and all negative codes) are treated as outside
/// the protocol's known range.
const MAX_KNOWN_CODE: i32 = 99;

impl PrecheckStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Busy),
            2 => Some(Self::PlatformNotActive),
            3 => Some(Self::TransactionExpired),
            4..=MAX_KNOWN_CODE => Some(Self::Other(code)),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match *self {
            Self::Ok => 0,
            Self::Busy => 1,
            Self::PlatformNotActive => 2,
            Self::TransactionExpired => 3,
            Self::Other(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_codes() {
        assert_eq!(PrecheckStatus::from_code(0), Some(PrecheckStatus::Ok));
        assert_eq!(PrecheckStatus::from_code(1), Some(PrecheckStatus::Busy));
    }

    #[test]
    fn out_of_range_codes_are_unrecognized() {
        assert_eq!(PrecheckStatus::from_code(-1), None);
        assert_eq!(PrecheckStatus::from_code(100), None);
    }
}
