//! Test media files

/// An MP3 looking buffer (ID3 tag header) of `size` bytes, at least 10.
pub fn sample_mp3(size: usize) -> Vec<u8> {
    let mut bytes = vec![b'I', b'D', b'3', 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    bytes.resize(size.max(bytes.len()), 0xAA);
    bytes
}

/// A PNG signature followed by padding.
#[allow(dead_code)]
pub fn sample_png() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(256, 0);
    bytes
}
