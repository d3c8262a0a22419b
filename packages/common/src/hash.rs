/// One-way content hash of serialized document bytes.
///
/// Used to decide whether a persist actually changed anything on disk.
pub trait ContentHasher {
    fn hash(&self, bytes: &[u8]) -> String;
}

/// CRC32 content hasher, rendered as lowercase hex
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32Hasher;

impl ContentHasher for Crc32Hasher {
    fn hash(&self, bytes: &[u8]) -> String {
        format!("{:08x}", crc32fast::hash(bytes))
    }
}
