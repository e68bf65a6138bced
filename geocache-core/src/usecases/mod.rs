use crate::{entities::*, repositories::AddressRepo};

mod address_stats;
mod error;
mod lookup_address;
mod resolve_addresses;


type Result<T> = std::result::Result<T, Error>;

pub use self::{address_stats::*, error::Error, lookup_address::*, resolve_addresses::*};
