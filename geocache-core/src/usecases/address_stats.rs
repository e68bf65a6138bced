use super::*;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AddressStats {
    pub entries: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

pub fn address_stats<'a, I>(addresses: I) -> AddressStats
where
    I: IntoIterator<Item = &'a str>,
{
    addresses
        .into_iter()
        .fold(AddressStats::default(), |mut stats, address| {
            stats.entries += 1;
            if GeocodeResult::from_stored(address).is_resolved() {
                stats.resolved += 1;
            } else {
                stats.unresolved += 1;
            }
            stats
        })
}
