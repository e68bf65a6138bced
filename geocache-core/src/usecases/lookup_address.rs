use super::*;

/// Looks up a single coordinate in the store without querying any gateway.
pub fn lookup_address<R: AddressRepo>(
    repo: &R,
    lat: f64,
    lon: f64,
) -> Result<Option<GeocodeResult>> {
    let key = CoordinateKey::try_from_lat_lon(lat, lon)?;
    Ok(repo
        .get_address(&key)
        .map(|address| GeocodeResult::from_stored(&address)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::tests::MockDb;

    #[test]
    fn lookup_cached_and_missing_addresses() {
        let db = MockDb::with_addresses(&[
            ("1.23,4.56", "Main St"),
            ("5.0,6.0", UNRESOLVED_ADDRESS),
        ]);
        assert_eq!(
            lookup_address(&db, 1.23, 4.56).unwrap(),
            Some(GeocodeResult::Resolved("Main St".into()))
        );
        assert_eq!(
            lookup_address(&db, 5.0, 6.0).unwrap(),
            Some(GeocodeResult::Unresolved)
        );
        assert_eq!(lookup_address(&db, 7.0, 8.0).unwrap(), None);
    }

    #[test]
    fn lookup_invalid_coordinate() {
        let db = MockDb::default();
        assert!(matches!(
            lookup_address(&db, f64::NAN, 0.0),
            Err(Error::InvalidCoordinate(_))
        ));
    }
}
