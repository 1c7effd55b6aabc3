use super::RoutingTable;
use crate::error::AdvertisementError;
use crate::network::packet::MAX_ADDRESS;
use crate::Address;

const ENTRY_SEPARATOR: char = '/';
const FIELD_SEPARATOR: char = ',';

/// Distance vector carried in the payload of a CONTROL packet.
///
/// Wire form is `dest,cost/` repeated once per route, e.g. `1,0/3,2/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteAdvertisement {
    routes: Vec<(Address, u32)>,
}

impl RouteAdvertisement {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Advertises every route in `table`. With `skip_interface` set, routes whose
    /// egress is that interface are left out (split horizon).
    pub fn from_table(table: &RoutingTable, skip_interface: Option<usize>) -> Self {
        Self {
            routes: table
                .iter()
                .filter(|(_, entry)| Some(entry.interface) != skip_interface)
                .map(|(dest, entry)| (dest, entry.cost))
                .collect(),
        }
    }

    pub fn push(&mut self, destination: Address, cost: u32) {
        self.routes.push((destination, cost));
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, u32)> + '_ {
        self.routes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn encode(&self) -> String {
        self.routes
            .iter()
            .map(|(dest, cost)| format!("{dest}{FIELD_SEPARATOR}{cost}{ENTRY_SEPARATOR}"))
            .collect()
    }

    /// Parses a routing message. Empty segments are skipped; any other
    /// malformed segment rejects the whole message.
    pub fn decode(payload: &[u8]) -> Result<Self, AdvertisementError> {
        let message = std::str::from_utf8(payload).map_err(|_| AdvertisementError::NotUtf8)?;

        let mut routes = Vec::new();
        for segment in message.split(ENTRY_SEPARATOR).filter(|s| !s.is_empty()) {
            let malformed = || AdvertisementError::MalformedEntry(segment.to_string());

            let (dest, cost) = segment.split_once(FIELD_SEPARATOR).ok_or_else(malformed)?;
            let dest: Address = dest.parse().map_err(|_| malformed())?;
            let cost: u32 = cost.parse().map_err(|_| malformed())?;
            if dest > MAX_ADDRESS {
                return Err(malformed());
            }

            routes.push((dest, cost));
        }

        Ok(Self { routes })
    }
}

impl FromIterator<(Address, u32)> for RouteAdvertisement {
    fn from_iter<I: IntoIterator<Item = (Address, u32)>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RouteEntry;

    #[test]
    fn test_encode_format() {
        let advert: RouteAdvertisement = [(1, 0), (3, 2)].into_iter().collect();
        assert_eq!(advert.encode(), "1,0/3,2/");
        assert_eq!(RouteAdvertisement::new().encode(), "");
    }

    #[test]
    fn test_decode_skips_empty_segments() {
        let advert = RouteAdvertisement::decode(b"/1,4//2,7").unwrap();
        assert_eq!(advert.iter().collect::<Vec<_>>(), vec![(1, 4), (2, 7)]);

        let empty = RouteAdvertisement::decode(b"").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(
            RouteAdvertisement::decode(b"1,0/oops/"),
            Err(AdvertisementError::MalformedEntry("oops".into()))
        );
        assert_eq!(
            RouteAdvertisement::decode(b"1,-3/"),
            Err(AdvertisementError::MalformedEntry("1,-3".into()))
        );
        assert_eq!(
            RouteAdvertisement::decode(b"100000,1/"),
            Err(AdvertisementError::MalformedEntry("100000,1".into()))
        );
        assert_eq!(
            RouteAdvertisement::decode(&[0xff, 0xfe]),
            Err(AdvertisementError::NotUtf8)
        );
    }

    #[test]
    fn test_from_table_split_horizon() {
        let table: RoutingTable = [
            (1, RouteEntry::new(0, 0)),
            (2, RouteEntry::new(1, 4)),
            (3, RouteEntry::new(1, 6)),
        ]
        .into_iter()
        .collect();

        let full = RouteAdvertisement::from_table(&table, None);
        assert_eq!(full.encode(), "1,0/2,4/3,6/");

        let toward_one = RouteAdvertisement::from_table(&table, Some(1));
        assert_eq!(toward_one.encode(), "1,0/");
    }

    #[test]
    fn test_decode_of_encoded_table() {
        let table: RoutingTable = [(10, RouteEntry::new(0, 3)), (99_999, RouteEntry::new(2, 0))]
            .into_iter()
            .collect();
        let encoded = RouteAdvertisement::from_table(&table, None).encode();
        let decoded = RouteAdvertisement::decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded.iter().collect::<Vec<_>>(), vec![(10, 3), (99_999, 0)]);
    }
}
