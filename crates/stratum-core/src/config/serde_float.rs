// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serde helpers that write floats as 3-decimal strings and read strings or numbers.
//!
//! Use with `#[serde(with = "fixed3")]` on `f32` fields and
//! `#[serde(with = "fixed3_array")]` on `[f32; N]` fields.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde::ser::{SerializeTuple, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum FloatRepr {
    Number(f32),
    Text(String),
}

impl FloatRepr {
    fn into_f32<E: de::Error>(self) -> Result<f32, E> {
        match self {
            FloatRepr::Number(value) => Ok(value),
            FloatRepr::Text(text) => text
                .trim()
                .parse::<f32>()
                .map_err(|_| E::custom(format!("invalid float string '{text}'"))),
        }
    }
}

fn format(value: f32) -> String {
    format!("{value:.3}")
}

/// `f32` as a 3-decimal string.
pub mod fixed3 {
    use super::*;

    /// Writes `value` as `"1.250"`.
    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*value))
    }

    /// Reads `"1.25"` or `1.25`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        FloatRepr::deserialize(deserializer)?.into_f32()
    }
}

/// `[f32; N]` as an array of 3-decimal strings.
pub mod fixed3_array {
    use super::*;

    /// Writes every component as a 3-decimal string.
    pub fn serialize<S: Serializer, const N: usize>(
        values: &[f32; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(N)?;
        for value in values {
            tuple.serialize_element(&format(*value))?;
        }
        tuple.end()
    }

    /// Reads exactly `N` components, each a string or a number.
    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[f32; N], D::Error> {
        let raw = Vec::<FloatRepr>::deserialize(deserializer)?;
        if raw.len() != N {
            return Err(de::Error::invalid_length(
                raw.len(),
                &format!("an array of {N} floats").as_str(),
            ));
        }
        let mut values = [0.0; N];
        for (slot, repr) in values.iter_mut().zip(raw) {
            *slot = repr.into_f32()?;
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super::fixed3")]
        scalar: f32,
        #[serde(with = "super::fixed3_array")]
        vector: [f32; 3],
    }

    #[test]
    fn writes_three_decimal_strings() {
        let json = serde_json::to_string(&Sample {
            scalar: 1.0 / 3.0,
            vector: [1.0, -0.5, 2.25],
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"scalar":"0.333","vector":["1.000","-0.500","2.250"]}"#
        );
    }

    #[test]
    fn reads_strings_and_numbers() {
        let sample: Sample =
            serde_json::from_str(r#"{"scalar": 2, "vector": ["1.5", 0.25, " 3 "]}"#).unwrap();
        assert_eq!(
            sample,
            Sample {
                scalar: 2.0,
                vector: [1.5, 0.25, 3.0]
            }
        );
    }

    #[test]
    fn rejects_wrong_lengths_and_garbage() {
        assert!(serde_json::from_str::<Sample>(r#"{"scalar": 1, "vector": [1, 2]}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"scalar": "abc", "vector": [1, 2, 3]}"#).is_err());
    }
}
