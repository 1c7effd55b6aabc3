use crate::error::{DecodeError, EncodeError};
use crate::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ADDRESS_LEN: usize = 5;
pub const PROTOCOL_LEN: usize = 1;
pub const HEADER_LEN: usize = ADDRESS_LEN + PROTOCOL_LEN;
pub const MAX_ADDRESS: Address = 99_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Data,
    Control,
}

impl Protocol {
    pub fn tag(self) -> u8 {
        match self {
            Protocol::Data => b'1',
            Protocol::Control => b'2',
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, DecodeError> {
        match tag {
            b'1' => Ok(Protocol::Data),
            b'2' => Ok(Protocol::Control),
            other => Err(DecodeError::UnknownProtocol(other as char)),
        }
    }
}

impl FromStr for Protocol {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "data" => Ok(Protocol::Data),
            "control" => Ok(Protocol::Control),
            _ => Err(EncodeError::UnknownProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Data => write!(f, "data"),
            Protocol::Control => write!(f, "control"),
        }
    }
}

/// Network-layer packet. Built once by the sender and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    destination: Address,
    protocol: Protocol,
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(destination: Address, protocol: Protocol, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            destination,
            protocol,
            payload: payload.into(),
        }
    }

    pub fn data(destination: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(destination, Protocol::Data, payload)
    }

    pub fn control(destination: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(destination, Protocol::Control, payload)
    }

    pub fn destination(&self) -> Address {
        self.destination
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serializes to `zero_pad(destination, 5) || tag || payload`.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if self.destination > MAX_ADDRESS {
            return Err(EncodeError::AddressOutOfRange(self.destination));
        }

        let mut bytes = Vec::with_capacity(HEADER_LEN + self.payload.len());
        bytes.extend_from_slice(format!("{:0width$}", self.destination, width = ADDRESS_LEN).as_bytes());
        bytes.push(self.protocol.tag());
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::TooShort {
                min: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let address_field = &bytes[..ADDRESS_LEN];
        if !address_field.iter().all(u8::is_ascii_digit) {
            return Err(DecodeError::InvalidAddress(
                String::from_utf8_lossy(address_field).into_owned(),
            ));
        }
        // Five ASCII digits always fit in a u32.
        let destination = address_field
            .iter()
            .fold(0, |acc: Address, digit| acc * 10 + Address::from(digit - b'0'));

        let protocol = Protocol::from_tag(bytes[ADDRESS_LEN])?;

        Ok(Self {
            destination,
            protocol,
            payload: bytes[HEADER_LEN..].to_vec(),
        })
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0width$}{}{}",
            self.destination,
            self.protocol.tag() as char,
            String::from_utf8_lossy(&self.payload),
            width = ADDRESS_LEN
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let packet = Packet::data(42, "hello");
        assert_eq!(packet.encode().unwrap(), b"000421hello".to_vec());

        let packet = Packet::control(0, "1,0/");
        assert_eq!(packet.encode().unwrap(), b"0000021,0/".to_vec());
    }

    #[test]
    fn test_encode_max_address() {
        let packet = Packet::data(MAX_ADDRESS, "");
        assert_eq!(packet.encode().unwrap(), b"999991".to_vec());
    }

    #[test]
    fn test_encode_rejects_wide_address() {
        let packet = Packet::data(100_000, "x");
        assert_eq!(packet.encode(), Err(EncodeError::AddressOutOfRange(100_000)));
    }

    #[test]
    fn test_protocol_from_str() {
        assert_eq!("data".parse::<Protocol>().unwrap(), Protocol::Data);
        assert_eq!("CONTROL".parse::<Protocol>().unwrap(), Protocol::Control);
        assert_eq!(
            "voice".parse::<Protocol>(),
            Err(EncodeError::UnknownProtocol("voice".into()))
        );
    }

    #[test]
    fn test_decode_fields() {
        let packet = Packet::decode(b"000052payload/with,commas").unwrap();
        assert_eq!(packet.destination(), 5);
        assert_eq!(packet.protocol(), Protocol::Control);
        assert_eq!(packet.payload(), b"payload/with,commas");
    }

    #[test]
    fn test_decode_empty_payload() {
        let packet = Packet::decode(b"123451").unwrap();
        assert_eq!(packet.destination(), 12345);
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            Packet::decode(b"00001"),
            Err(DecodeError::TooShort { min: 6, actual: 5 })
        );
        assert_eq!(Packet::decode(b""), Err(DecodeError::TooShort { min: 6, actual: 0 }));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert_eq!(Packet::decode(b"000013abc"), Err(DecodeError::UnknownProtocol('3')));
    }

    #[test]
    fn test_decode_non_numeric_address() {
        assert_eq!(
            Packet::decode(b"00x011"),
            Err(DecodeError::InvalidAddress("00x01".into()))
        );
        // A sign is not a digit.
        assert!(matches!(Packet::decode(b"+00011"), Err(DecodeError::InvalidAddress(_))));
    }

    #[test]
    fn test_display_matches_wire_form() {
        let packet = Packet::data(7, "hi");
        assert_eq!(packet.to_string(), "000071hi");
    }

    fn protocol_strategy() -> impl Strategy<Value = Protocol> {
        prop_oneof![Just(Protocol::Data), Just(Protocol::Control)]
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            destination in 0..=MAX_ADDRESS,
            protocol in protocol_strategy(),
            payload in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let packet = Packet::new(destination, protocol, payload);
            let bytes = packet.encode().unwrap();
            prop_assert_eq!(bytes.len(), HEADER_LEN + packet.payload().len());
            prop_assert_eq!(Packet::decode(&bytes).unwrap(), packet);
        }

        #[test]
        fn prop_out_of_range_rejected(destination in (MAX_ADDRESS + 1)..=Address::MAX) {
            let packet = Packet::data(destination, "x");
            prop_assert_eq!(packet.encode(), Err(EncodeError::AddressOutOfRange(destination)));
        }
    }
}
