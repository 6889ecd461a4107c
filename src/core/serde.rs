/*!
 * Serde Helpers
 * Wire encodings for timestamps and durations in reports
 *
 * Timestamps are whole microseconds since the UNIX epoch; report-level
 * durations are fractional seconds, sample intervals whole microseconds.
 */

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn epoch_micros<E: serde::ser::Error>(time: &SystemTime) -> Result<u64, E> {
    time.duration_since(UNIX_EPOCH)
        .map(|since| since.as_micros() as u64)
        .map_err(E::custom)
}

fn from_epoch_micros(micros: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_micros(micros)
}

pub mod system_time_micros {
    use super::*;

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(epoch_micros::<S::Error>(time)?)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        u64::deserialize(deserializer).map(from_epoch_micros)
    }
}

/// `None` encodes as `null`
pub mod optional_system_time_micros {
    use super::*;

    pub fn serialize<S: Serializer>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_some(&epoch_micros::<S::Error>(time)?),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SystemTime>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(from_epoch_micros))
    }
}

/// Negative or non-finite seconds are rejected on input
pub mod duration_secs {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

pub mod duration_micros {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_micros() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}

/// `skip_serializing_if` predicate for optional fields
pub fn is_none<T>(value: &Option<T>) -> bool {
    value.is_none()
}
