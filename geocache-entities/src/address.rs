/// Stored in place of an address if a coordinate could not be resolved.
pub const UNRESOLVED_ADDRESS: &str = "Sin dirección";

/// The outcome of a single reverse geocoding lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeResult {
    Resolved(String),
    Unresolved,
}

impl GeocodeResult {
    /// Blank display names are not a usable address.
    pub fn resolved<S: Into<String>>(display_name: S) -> Self {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            Self::Unresolved
        } else {
            Self::Resolved(display_name)
        }
    }

    pub fn from_stored(address: &str) -> Self {
        if address == UNRESOLVED_ADDRESS {
            Self::Unresolved
        } else {
            Self::resolved(address)
        }
    }

    pub fn into_stored(self) -> String {
        match self {
            Self::Resolved(address) => address,
            Self::Unresolved => UNRESOLVED_ADDRESS.to_owned(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}
