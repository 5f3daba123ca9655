use crate::id::ContentId;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is prepended to every hash computation so that identical
/// bytes hashed for different purposes never share an identifier.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for log identities.
    pub const LOG: Self = Self::new("caskade-log-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentId::from_hash(*hasher.finalize().as_bytes())
    }
}
