//! Serde support for `std::time::Duration` in humantime notation.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Timeouts {
//!     #[serde(with = "shipload_bootstrap::duration_serde")]
//!     callback: Duration,
//! }
//!
//! let t: Timeouts = serde_json::from_str(r#"{"callback": "1m 30s"}"#).unwrap();
//! assert_eq!(t.callback, Duration::from_secs(90));
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserializer, Serializer, de};

/// Serializes a `Duration` as a humantime string (`"10s"`, `"1m 30s"`).
///
/// # Errors
/// Propagates serializer errors.
pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*value))
}

/// Deserializes a `Duration` from a humantime string.
///
/// # Errors
/// Fails when the input is not a string or cannot be parsed as a duration.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl de::Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a duration such as \"10s\" or \"500ms\"")
        }

        fn visit_str<E>(self, v: &str) -> Result<Duration, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_str(DurationVisitor)
}
