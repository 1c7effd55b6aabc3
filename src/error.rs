//! Error types for the packet codec, link queues and routing protocol.

use crate::network::Direction;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("destination address {0} does not fit in 5 digits")]
    AddressOutOfRange(u32),

    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("packet too short: need {min} bytes, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("invalid destination field: {0:?}")]
    InvalidAddress(String),

    #[error("unknown protocol tag: {0:?}")]
    UnknownProtocol(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{direction} queue full (capacity {capacity})")]
pub struct QueueFullError {
    pub direction: Direction,
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    QueueFull(#[from] QueueFullError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvertisementError {
    #[error("routing message is not valid UTF-8")]
    NotUtf8,

    #[error("malformed route entry: {0:?}")]
    MalformedEntry(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("unknown packet type: tag {0:?}")]
    UnknownPacketType(char),

    #[error("decode error: {0}")]
    Decode(DecodeError),

    #[error("bad routing update: {0}")]
    Advertisement(#[from] AdvertisementError),

    #[error("interface {0} does not exist")]
    NoSuchInterface(usize),
}

impl From<DecodeError> for RouterError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnknownProtocol(tag) => RouterError::UnknownPacketType(tag),
            other => RouterError::Decode(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_display() {
        let err = EncodeError::AddressOutOfRange(123456);
        assert_eq!(err.to_string(), "destination address 123456 does not fit in 5 digits");

        let err = EncodeError::UnknownProtocol("voice".into());
        assert_eq!(err.to_string(), "unknown protocol: voice");
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TooShort { min: 6, actual: 3 };
        assert_eq!(err.to_string(), "packet too short: need 6 bytes, got 3");

        let err = DecodeError::UnknownProtocol('7');
        assert_eq!(err.to_string(), "unknown protocol tag: '7'");
    }

    #[test]
    fn test_queue_full_display() {
        let err = QueueFullError {
            direction: Direction::Out,
            capacity: 4,
        };
        assert_eq!(err.to_string(), "out queue full (capacity 4)");
    }

    #[test]
    fn test_router_error_from_unknown_tag() {
        let re: RouterError = DecodeError::UnknownProtocol('9').into();
        assert_eq!(re, RouterError::UnknownPacketType('9'));
    }

    #[test]
    fn test_router_error_from_other_decode_errors() {
        let re: RouterError = DecodeError::TooShort { min: 6, actual: 0 }.into();
        assert!(matches!(re, RouterError::Decode(DecodeError::TooShort { .. })));
    }

    #[test]
    fn test_router_error_from_advertisement() {
        let re: RouterError = AdvertisementError::MalformedEntry("x".into()).into();
        assert!(matches!(re, RouterError::Advertisement(_)));
        assert_eq!(re.to_string(), "bad routing update: malformed route entry: \"x\"");
    }
}
