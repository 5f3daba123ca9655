use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ShapeError;

/// A plain payload type carried by an entry kind.
///
/// Value records are encoded as JSON. Decoding doubles as structural
/// validation: a payload that is missing a required field, or carries a field
/// of the wrong type, fails to decode.
pub trait ValueRecord: Serialize + DeserializeOwned {
    /// Name recorded in the catalog for kinds carrying this record.
    const TYPE_NAME: &'static str;

    fn encode(&self) -> Result<Vec<u8>, ShapeError> {
        serde_json::to_vec(self).map_err(|e| ShapeError::Encode {
            type_name: Self::TYPE_NAME,
            reason: e.to_string(),
        })
    }

    fn decode(bytes: &[u8]) -> Result<Self, ShapeError> {
        serde_json::from_slice(bytes).map_err(|e| ShapeError::Decode {
            type_name: Self::TYPE_NAME,
            reason: e.to_string(),
        })
    }
}

fn validate_record<T: ValueRecord>(bytes: &[u8]) -> Result<(), ShapeError> {
    T::decode(bytes).map(|_| ())
}

/// Describes the payload an entry kind carries.
///
/// The log engine and the index layer only ever call [`PayloadShape::validate`];
/// they never look inside a payload they do not own.
#[derive(Clone, Copy)]
pub enum PayloadShape {
    /// The record has no payload.
    Empty,
    /// Opaque bytes, owned by the log engine.
    Bytes,
    /// A structured [`ValueRecord`].
    Record {
        type_name: &'static str,
        validate: fn(&[u8]) -> Result<(), ShapeError>,
    },
}

impl PayloadShape {
    /// Shape descriptor for the value record `T`.
    pub const fn record<T: ValueRecord>() -> Self {
        Self::Record {
            type_name: T::TYPE_NAME,
            validate: validate_record::<T>,
        }
    }

    /// Structural check of a raw payload against this shape.
    pub fn validate(&self, payload: &[u8]) -> Result<(), ShapeError> {
        match self {
            Self::Empty if payload.is_empty() => Ok(()),
            Self::Empty => Err(ShapeError::UnexpectedPayload { len: payload.len() }),
            Self::Bytes => Ok(()),
            Self::Record { validate, .. } => validate(payload),
        }
    }

    /// Stable text form used in catalogs.
    pub fn label(&self) -> String {
        match self {
            Self::Empty => "empty".into(),
            Self::Bytes => "bytes".into(),
            Self::Record { type_name, .. } => format!("record:{type_name}"),
        }
    }
}

impl fmt::Debug for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayloadShape({})", self.label())
    }
}

impl PartialEq for PayloadShape {
    fn eq(&self, other: &Self) -> bool {
        self.label() == other.label()
    }
}

impl Eq for PayloadShape {}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        size: u32,
    }

    impl ValueRecord for Sample {
        const TYPE_NAME: &'static str = "Sample";
    }

    #[test]
    fn record_shape_validates_structure() {
        let shape = PayloadShape::record::<Sample>();
        assert!(shape.validate(br#"{"name":"a","size":3}"#).is_ok());
        assert!(shape.validate(br#"{"name":"a"}"#).is_err());
        assert!(shape.validate(br#"{"name":"a","size":"big"}"#).is_err());
        assert!(shape.validate(br#"{"name":"a","si"#).is_err());
    }

    #[test]
    fn empty_shape_rejects_payload() {
        assert!(PayloadShape::Empty.validate(b"").is_ok());
        assert_eq!(
            PayloadShape::Empty.validate(b"xy"),
            Err(ShapeError::UnexpectedPayload { len: 2 })
        );
        assert!(PayloadShape::Bytes.validate(b"anything").is_ok());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(PayloadShape::Empty.label(), "empty");
        assert_eq!(PayloadShape::Bytes.label(), "bytes");
        assert_eq!(PayloadShape::record::<Sample>().label(), "record:Sample");
        assert_eq!(PayloadShape::record::<Sample>(), PayloadShape::record::<Sample>());
        assert_ne!(PayloadShape::Bytes, PayloadShape::Empty);
    }

    #[test]
    fn encode_decode() {
        let sample = Sample { name: "p".into(), size: 9 };
        let bytes = sample.encode().unwrap();
        assert_eq!(Sample::decode(&bytes).unwrap(), sample);
        let err = Sample::decode(b"[]").unwrap_err();
        assert!(matches!(err, ShapeError::Decode { type_name: "Sample", .. }));
    }
}
