mod bookings;
mod mongodb;
mod tickets;
mod users;

pub use self::mongodb::MongoDB;
pub(crate) use self::mongodb::is_duplicate_key;
