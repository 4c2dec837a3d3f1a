use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// --- Data Structures ---

/// One OHLCV sample. `time` is the candle open time in milliseconds since epoch.
///
/// On the wire a candle is the exchange array form
/// `[time, open, high, low, close, volume, ...]` where any number may also be
/// sent as a string. Trailing elements are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// The `{time, close}` view of a candle used for pair alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: i64,
    pub close: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Re-prices the candle with a conversion rate (display currency per quote unit).
    /// Volume is a quantity and stays as is.
    pub fn convert(&self, rate: f64) -> Self {
        Self {
            open: self.open * rate,
            high: self.high * rate,
            low: self.low * rate,
            close: self.close * rate,
            ..*self
        }
    }
}

impl From<&Candle> for PricePoint {
    fn from(candle: &Candle) -> Self {
        Self {
            time: candle.time,
            close: candle.close,
        }
    }
}

// --- Lenient number decoding ---

struct LenientF64Visitor;

impl<'de> Visitor<'de> for LenientF64Visitor {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a float, an integer, or a string representing a number")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if v.trim().is_empty() {
            Ok(None)
        } else {
            v.trim().parse::<f64>().map(Some).map_err(E::custom)
        }
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

struct LenientF64(Option<f64>);

impl<'de> Deserialize<'de> for LenientF64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LenientF64Visitor).map(LenientF64)
    }
}

struct CandleVisitor;

const FIELDS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

impl<'de> Visitor<'de> for CandleVisitor {
    type Value = Candle;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a kline array [time, open, high, low, close, volume, ...]")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut values = [None; 6];
        for (i, slot) in values.iter_mut().enumerate() {
            match seq.next_element::<LenientF64>()? {
                Some(LenientF64(v)) => *slot = v,
                // volume is optional on the wire
                None if i == 5 => break,
                None => return Err(de::Error::invalid_length(i, &self)),
            }
        }
        while seq.next_element::<IgnoredAny>()?.is_some() {}

        let [time, open, high, low, close, volume] = values;
        let required = |v: Option<f64>, idx: usize| -> Result<f64, A::Error> {
            v.ok_or_else(|| de::Error::missing_field(FIELDS[idx]))
        };

        Ok(Candle {
            time: required(time, 0)? as i64,
            open: required(open, 1)?,
            high: required(high, 2)?,
            low: required(low, 3)?,
            close: required(close, 4)?,
            volume: volume.unwrap_or(0.0),
        })
    }
}

impl<'de> Deserialize<'de> for Candle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(CandleVisitor)
    }
}

impl Serialize for Candle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(6)?;
        tuple.serialize_element(&self.time)?;
        tuple.serialize_element(&self.open)?;
        tuple.serialize_element(&self.high)?;
        tuple.serialize_element(&self.low)?;
        tuple.serialize_element(&self.close)?;
        tuple.serialize_element(&self.volume)?;
        tuple.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_string_and_number_fields() {
        let raw = r#"[1700000000000, "100.5", "110", 90, "105.25", "1234.5", 1700086399999, "ignored"]"#;
        let candle: Candle = serde_json::from_str(raw).unwrap();
        assert_eq!(candle.time, 1_700_000_000_000);
        assert_eq!(candle.open, 100.5);
        assert_eq!(candle.high, 110.0);
        assert_eq!(candle.low, 90.0);
        assert_eq!(candle.close, 105.25);
        assert_eq!(candle.volume, 1234.5);
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let candle: Candle = serde_json::from_str(r#"[1, 2, 3, 1, 2]"#).unwrap();
        assert_eq!(candle.volume, 0.0);

        let candle: Candle = serde_json::from_str(r#"[1, 2, 3, 1, 2, ""]"#).unwrap();
        assert_eq!(candle.volume, 0.0);
    }

    #[test]
    fn rejects_missing_close() {
        assert!(serde_json::from_str::<Candle>(r#"[1, 2, 3, 1, "", 5]"#).is_err());
        assert!(serde_json::from_str::<Candle>(r#"[1, 2, 3]"#).is_err());
        assert!(serde_json::from_str::<Candle>(r#"[1, "abc", 3, 1, 2, 5]"#).is_err());
    }

    #[test]
    fn serializes_back_to_array_form() {
        let candle = Candle::new(42, 1.0, 2.0, 0.5, 1.5, 10.0);
        let json = serde_json::to_string(&candle).unwrap();
        assert_eq!(json, "[42,1.0,2.0,0.5,1.5,10.0]");
        let back: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candle);
    }

    #[test]
    fn convert_scales_prices_only() {
        let candle = Candle::new(0, 10.0, 12.0, 8.0, 11.0, 500.0).convert(2.0);
        assert_eq!((candle.open, candle.high, candle.low, candle.close), (20.0, 24.0, 16.0, 22.0));
        assert_eq!(candle.volume, 500.0);
    }
}
