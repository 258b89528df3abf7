use chrono::Utc;
use rand::Rng;

use crate::taxonomy::CategoryId;

/// Generate a practically-unique entry id: base-36 millisecond timestamp
/// followed by a base-36 random suffix. No counter state; collisions would
/// require two ids in the same millisecond drawing the same 64-bit suffix.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let suffix: u64 = rand::thread_rng().r#gen();
    format!("{}{}", to_base36(millis), to_base36(suffix))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Build the stable tag id `category/subcategory-slug/label-slug`.
///
/// The category id is kept verbatim (case-sensitive enum value, so
/// `dreamTypes` never degrades to `dreamtypes`); subcategory and label are
/// slugged. Re-slugging an already-built id's components yields the same id.
pub fn build_tag_id(category_id: CategoryId, subcategory_id: &str, label: &str) -> String {
    format!(
        "{}/{}/{}",
        category_id.as_str(),
        slug(subcategory_id),
        slug(label)
    )
}

/// Lower-case, strip everything outside `[a-z0-9\s\-/]`, collapse whitespace
/// runs to a single hyphen and slash runs to a single slash.
pub fn slug(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    for c in input.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '/' || c.is_whitespace()
        {
            cleaned.push(c);
        }
    }

    let mut out = String::with_capacity(cleaned.len());
    let mut pending_hyphen = false;
    for c in cleaned.chars() {
        if c.is_whitespace() {
            pending_hyphen = true;
            continue;
        }
        if pending_hyphen {
            out.push('-');
            pending_hyphen = false;
        }
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    if pending_hyphen {
        out.push('-');
    }
    out
}
