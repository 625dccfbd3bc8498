//! Text decoding and offset helpers shared by the loader and the codec.

use std::borrow::Cow;

use memchr::memmem;

/// Decode bytes to a string, handling various encodings.
///
/// UTF-8 is tried first (a BOM is handled by encoding_rs). Malformed input is
/// retried with the hint encoding from an `<?xml encoding="..."?>`
/// declaration, then with Windows-1252, which older ebooks commonly use.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Encoding named by a leading XML declaration, if any.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];
    let decl = &prefix[memmem::find(prefix, b"<?xml")?..];
    let decl = &decl[..memmem::find(decl, b"?>").unwrap_or(decl.len())];

    let pos = decl
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let rest = &decl[pos + 9..];
    let quote = *rest.first().filter(|&&q| q == b'"' || q == b'\'')?;
    let end = memchr::memchr(quote, &rest[1..])?;

    std::str::from_utf8(&rest[1..1 + end]).ok()
}

/// Character range of the first occurrence of `needle` in `haystack`.
///
/// Offsets count Unicode scalar values, which is how engines address text.
pub fn find_char_range(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    let byte_start = memmem::find(haystack.as_bytes(), needle.as_bytes())?;
    let start = haystack[..byte_start].chars().count();
    Some((start, start + needle.chars().count()))
}

/// Resolve `rel` against the directory of `base` without touching the filesystem.
///
/// Used to turn OPF-relative manifest hrefs into archive paths.
pub fn resolve_path(base: &str, rel: &str) -> String {
    if let Some(absolute) = rel.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = base.split('/').collect();
    parts.pop();
    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.retain(|p| !p.is_empty());
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_passthrough() {
        assert_eq!(decode_text("Hello, 세계".as_bytes(), None), "Hello, 세계");
    }

    #[test]
    fn test_decode_falls_back_to_hint() {
        let bytes = b"na\xefve";
        assert_eq!(decode_text(bytes, Some("iso-8859-1")), "naïve");
    }

    #[test]
    fn test_extract_xml_encoding() {
        let doc = br#"<?xml version="1.0" encoding='UTF-8'?><html/>"#;
        assert_eq!(extract_xml_encoding(doc), Some("UTF-8"));
        assert_eq!(extract_xml_encoding(b"<html></html>"), None);
        assert_eq!(extract_xml_encoding(br#"<?xml version="1.0"?><p encoding="x"/>"#), None);
    }

    #[test]
    fn test_find_char_range_counts_chars_not_bytes() {
        assert_eq!(find_char_range("안녕 world", "world"), Some((3, 8)));
        assert_eq!(find_char_range("abc", "abc"), Some((0, 3)));
        assert_eq!(find_char_range("abc", "zzz"), None);
        assert_eq!(find_char_range("abc", ""), None);
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("OEBPS/content.opf", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_path("OEBPS/text/ch1.xhtml", "../img/a.png"), "OEBPS/img/a.png");
        assert_eq!(resolve_path("content.opf", "ch1.xhtml"), "ch1.xhtml");
        assert_eq!(resolve_path("OEBPS/content.opf", "/root.xhtml"), "root.xhtml");
    }
}
