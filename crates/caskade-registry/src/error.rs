use crate::kind::EntryCode;

/// Errors raised while building or consulting an entry-kind registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Two kinds claim the same numeric code.
    #[error("entry code {code} already registered as {existing}; cannot register {incoming}")]
    DuplicateCode {
        code: EntryCode,
        existing: &'static str,
        incoming: &'static str,
    },

    #[error("no entry kind registered for code {0}")]
    UnknownCode(EntryCode),

    /// A persisted catalog row disagrees with the registry.
    #[error("catalog mismatch for code {code}: registry has {expected}, log has {found}")]
    CatalogMismatch {
        code: EntryCode,
        expected: String,
        found: String,
    },
}

/// Errors from the payload codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("cannot decode {type_name}: {reason}")]
    Decode {
        type_name: &'static str,
        reason: String,
    },

    #[error("cannot encode {type_name}: {reason}")]
    Encode {
        type_name: &'static str,
        reason: String,
    },

    /// A kind declared without payload carried bytes.
    #[error("unexpected {len}-byte payload for a kind without payload")]
    UnexpectedPayload { len: usize },
}
