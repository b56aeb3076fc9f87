use crate::foundation::core::BlockKind;

/// Synthesize a stable block id from where and how a block was declared.
///
/// The input is the `messageId-offset-type-title` key fed through a 32-bit multiplicative
/// rolling hash. Collisions are possible and are not resolved here: two blocks that hash to the
/// same id are treated as the same block, last write wins.
pub fn synthesize_block_id(
    message_id: &str,
    start_offset: usize,
    kind: BlockKind,
    title: &str,
) -> String {
    let mut h = RollingHash32::new();
    h.write_str(message_id);
    h.write_char('-');
    h.write_str(&start_offset.to_string());
    h.write_char('-');
    h.write_str(kind.as_str());
    h.write_char('-');
    h.write_str(title);
    format!("output-{}", to_base36(h.finish().unsigned_abs()))
}

#[derive(Clone, Copy)]
struct RollingHash32(i32);

impl RollingHash32 {
    fn new() -> Self {
        Self(0)
    }

    fn write_char(&mut self, c: char) {
        // (h << 5) - h == h * 31
        let h = self.0;
        self.0 = (h << 5).wrapping_sub(h).wrapping_add(c as i32);
    }

    fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            self.write_char(c);
        }
    }

    fn finish(self) -> i32 {
        self.0
    }
}

fn to_base36(mut v: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if v == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while v > 0 {
        out.push(DIGITS[(v % 36) as usize]);
        v /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/hash.rs"]
mod tests;
