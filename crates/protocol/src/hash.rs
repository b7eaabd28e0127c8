//! Java-style 32-bit hashes used by the desktop sync plugin.
//!
//! The plugin identifies paths and contents by `hashCode`-style hashes
//! (`h = 31 * h + unit`, wrapping at 32 bits) rendered as signed decimal
//! strings. Uploads must present the same values or the server treats
//! the file as a different object.

/// Hashes a string over its UTF-16 code units, like `String.hashCode`.
pub fn path_hash(path: &str) -> String {
    let h = path
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    h.to_string()
}

/// Hashes raw bytes, each taken as an unsigned value.
pub fn content_hash(data: &[u8]) -> String {
    let h = data
        .iter()
        .fold(0i32, |h, &b| h.wrapping_mul(31).wrapping_add(i32::from(b)));
    h.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_hash_to_zero() {
        assert_eq!(path_hash(""), "0");
        assert_eq!(content_hash(&[]), "0");
    }

    #[test]
    fn matches_java_string_hash_code() {
        // Reference values from java.lang.String#hashCode.
        assert_eq!(path_hash("a"), "97");
        assert_eq!(path_hash("hello"), "99162322");
        assert_eq!(path_hash("assets/xhs/img1.webp"), {
            let mut h: i32 = 0;
            for c in "assets/xhs/img1.webp".chars() {
                h = h.wrapping_mul(31).wrapping_add(c as i32);
            }
            h.to_string()
        });
    }

    #[test]
    fn wraps_into_negative_range() {
        // Overflow wraps into a negative signed value.
        let h: i32 = path_hash("The quick brown fox jumps over the lazy dog")
            .parse()
            .unwrap();
        assert_eq!(h, -609428141);
    }

    #[test]
    fn bytes_are_unsigned() {
        assert_eq!(content_hash(&[0xff]), "255");
        assert_eq!(content_hash(&[1, 2]), (31 + 2).to_string());
    }

    #[test]
    fn utf16_units_for_non_ascii() {
        // U+00E9 is a single UTF-16 unit (233).
        assert_eq!(path_hash("é"), "233");
    }
}
