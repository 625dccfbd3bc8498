//! EPUB loading.
//!
//! Reads the container, the OPF manifest and spine, and parses every spine
//! document into a [`PaginatedBook`] section, in reading order. Only what
//! pagination and narration need is read; metadata, navigation documents and
//! media are skipped.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;

use crate::config::ReaderConfig;
use crate::dom;
use crate::error::{Error, Result};
use crate::paginated::{PaginatedBook, SectionContent};
use crate::util::resolve_path;

/// Open an EPUB file from disk.
///
/// ```no_run
/// use readsync::{ReaderConfig, epub};
///
/// let book = epub::open("path/to/book.epub", &ReaderConfig::default())?;
/// println!("{} sections", book.section_count());
/// # Ok::<(), readsync::Error>(())
/// ```
pub fn open<P: AsRef<Path>>(path: P, config: &ReaderConfig) -> Result<PaginatedBook> {
    let file = std::fs::File::open(path)?;
    from_reader(file, config)
}

/// Load an EPUB held in memory.
pub fn from_bytes(bytes: &[u8], config: &ReaderConfig) -> Result<PaginatedBook> {
    from_reader(Cursor::new(bytes), config)
}

/// Load an EPUB from any [`Read`] + [`Seek`] source.
pub fn from_reader<R: Read + Seek>(reader: R, config: &ReaderConfig) -> Result<PaginatedBook> {
    let mut archive = ZipArchive::new(reader)?;

    let container = read_entry(&mut archive, "META-INF/container.xml")
        .map_err(|_| Error::InvalidEpub("missing META-INF/container.xml".to_string()))?;
    let opf_path = parse_container(&container)?;

    let opf_bytes = read_entry(&mut archive, &opf_path)
        .map_err(|_| Error::InvalidEpub(format!("missing package document {opf_path}")))?;
    let opf = parse_opf(&decode(&opf_bytes))?;
    if opf.spine.is_empty() {
        return Err(Error::InvalidEpub("spine is empty".to_string()));
    }

    let mut sections = Vec::with_capacity(opf.spine.len());
    for idref in &opf.spine {
        let Some(item) = opf.manifest.get(idref) else {
            log::warn!("spine item {idref:?} is not in the manifest, skipping");
            continue;
        };
        let href = resolve_path(&opf_path, &decode_href(&item.href));
        let bytes = read_entry(&mut archive, &href)
            .map_err(|e| Error::InvalidEpub(format!("cannot read {href}: {e}")))?;
        log::debug!("loaded {href} ({} bytes, {})", bytes.len(), item.media_type);
        sections.push(SectionContent::new(
            href,
            Some(idref.clone()),
            dom::parse_html_bytes(&bytes),
        ));
    }

    Ok(PaginatedBook::new(sections, config))
}

struct ManifestItem {
    href: String,
    media_type: String,
}

struct Package {
    manifest: HashMap<String, ManifestItem>,
    /// Manifest ids in reading order.
    spine: Vec<String>,
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

fn decode(bytes: &[u8]) -> String {
    let hint = crate::util::extract_xml_encoding(bytes);
    crate::util::decode_text(bytes, hint).into_owned()
}

/// Manifest hrefs are URLs; archive entry names are not.
fn decode_href(href: &str) -> String {
    let path = href.split('#').next().unwrap_or(href);
    percent_encoding::percent_decode_str(path)
        .decode_utf8_lossy()
        .into_owned()
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() == name {
            return Ok(Some(String::from_utf8(attr.value.to_vec())?));
        }
    }
    Ok(None)
}

fn parse_container(bytes: &[u8]) -> Result<String> {
    let content = decode(bytes);
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path")? {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "no rootfile in container.xml".to_string(),
    ))
}

fn parse_opf(content: &str) -> Result<Package> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut manifest = HashMap::new();
    let mut spine = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) => match e.local_name().as_ref() {
                b"item" => {
                    let id = attribute(&e, b"id")?;
                    let href = attribute(&e, b"href")?;
                    if let (Some(id), Some(href)) = (id, href) {
                        let media_type = attribute(&e, b"media-type")?.unwrap_or_default();
                        manifest.insert(id, ManifestItem { href, media_type });
                    }
                }
                b"itemref" => {
                    if let Some(idref) = attribute(&e, b"idref")? {
                        spine.push(idref);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(Package { manifest, spine })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::engine::RenderingEngine;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <manifest>
    <item id="c2" href="text/chapter%202.xhtml" media-type="application/xhtml+xml"/>
    <item id="c1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
  </manifest>
  <spine>
    <itemref idref="c1"/>
    <itemref idref="c2"/>
  </spine>
</package>"#;

    fn build(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        for (name, body) in entries {
            zip.start_file(*name, deflated).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn sample() -> Vec<u8> {
        build(&[
            ("META-INF/container.xml", CONTAINER),
            ("OEBPS/content.opf", OPF),
            ("OEBPS/text/ch1.xhtml", "<html><body><h1>One</h1></body></html>"),
            ("OEBPS/text/chapter 2.xhtml", "<html><body><h1>Two</h1></body></html>"),
        ])
    }

    #[test]
    fn test_spine_order_and_hrefs() {
        let book = from_bytes(&sample(), &ReaderConfig::default()).unwrap();

        let sections: Vec<_> = book.sections().cloned().collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].href, "OEBPS/text/ch1.xhtml");
        assert_eq!(sections[0].idref.as_deref(), Some("c1"));
        assert_eq!(sections[1].href, "OEBPS/text/chapter 2.xhtml");
        assert_eq!(sections[1].index, 1);
    }

    #[test]
    fn test_positions_carry_spine_assertion() {
        let mut book = from_bytes(&sample(), &ReaderConfig::default()).unwrap();

        let relocation = book.display(1).unwrap();
        assert!(relocation.start.as_str().starts_with("epubcfi(/6/4[c2]!"));
        assert_eq!(book.current_section().unwrap().idref.as_deref(), Some("c2"));
    }

    #[test]
    fn test_open_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&sample()).unwrap();

        let book = open(file.path(), &ReaderConfig::default()).unwrap();
        assert_eq!(book.section_count(), 2);
    }

    #[test]
    fn test_missing_container_is_invalid() {
        let bytes = build(&[("OEBPS/content.opf", OPF)]);
        assert!(matches!(
            from_bytes(&bytes, &ReaderConfig::default()),
            Err(Error::InvalidEpub(_))
        ));
    }

    #[test]
    fn test_missing_spine_document_is_invalid() {
        let bytes = build(&[
            ("META-INF/container.xml", CONTAINER),
            ("OEBPS/content.opf", OPF),
            ("OEBPS/text/ch1.xhtml", "<p>only one</p>"),
        ]);
        assert!(matches!(
            from_bytes(&bytes, &ReaderConfig::default()),
            Err(Error::InvalidEpub(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            from_bytes(b"plain text", &ReaderConfig::default()),
            Err(Error::Zip(_))
        ));
    }

    #[test]
    fn test_empty_spine_is_invalid() {
        let opf = r#"<package><manifest/><spine/></package>"#;
        let bytes = build(&[("META-INF/container.xml", CONTAINER), ("OEBPS/content.opf", opf)]);
        assert!(matches!(
            from_bytes(&bytes, &ReaderConfig::default()),
            Err(Error::InvalidEpub(_))
        ));
    }
}
