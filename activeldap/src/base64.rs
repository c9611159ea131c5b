use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Encode `src` as a single unfolded base64 line.
pub fn encode(src: &[u8]) -> String {
    STANDARD.encode(src)
}

/// Encode `src` as base64, appending to `dst`.
pub fn append_base64(dst: &mut String, src: &[u8]) {
    STANDARD.encode_string(src, dst);
}

/// Decode base64 `src` into bytes, ignoring embedded whitespace (folded
/// LDIF values keep their line breaks until decoded).  Returns None on
/// invalid input.
pub fn read_base64(src: &str) -> Option<Vec<u8>> {
    let compact: String = src.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact.as_bytes()).ok()
}
