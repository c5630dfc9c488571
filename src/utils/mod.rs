pub mod fuzzy;
pub mod string_utils;
pub mod time_utils;
pub mod units;

// Re-export commonly used functions
pub use fuzzy::{fuzzy_filter, fuzzy_matches, fuzzy_string_match};
pub use string_utils::get_version;
pub use time_utils::*;
pub use units::{expand_to_n_decimals, float_to_big_number, UnitsError};
