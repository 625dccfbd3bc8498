use std::io::{Cursor, Write};

use readsync::{Message, ReaderConfig, ReadingSession, RecordingSink, RenderingEngine, epub};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const CONTENT_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test Book</dc:title>
    <dc:identifier id="id">test-book</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="title" href="text/title.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover" href="images/cover.jpg" media-type="image/jpeg"/>
  </manifest>
  <spine>
    <itemref idref="title"/>
    <itemref idref="ch1"/>
  </spine>
</package>"#;

const TITLE_XHTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Title</title></head>
<body><h1>Test Book</h1><img src="../images/cover.jpg" alt="Cover"/></body>
</html>"#;

const CH1_XHTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter 1</title></head>
<body><h2>Chapter 1</h2><p>It was a <span>dark</span> night.</p></body>
</html>"#;

fn epub_bytes() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    for (name, body) in [
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", CONTENT_OPF),
        ("OEBPS/nav.xhtml", "<html><body><nav/></body></html>"),
        ("OEBPS/text/title.xhtml", TITLE_XHTML),
        ("OEBPS/text/ch1.xhtml", CH1_XHTML),
    ] {
        zip.start_file(name, deflated).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[test]
fn test_open_epub_and_index_sections() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(&epub_bytes()).unwrap();

    let config = ReaderConfig::default();
    let book = epub::open(file.path(), &config).expect("Failed to read EPUB");
    assert_eq!(book.section_count(), 2);

    let log = RecordingSink::new();
    let mut session = ReadingSession::new(book, log.clone(), &config).unwrap();
    let first = session.engine_mut().display(0).unwrap();
    session.relocated(&first);
    let second = session.engine_mut().display(1).unwrap();
    session.relocated(&second);

    let indexes: Vec<_> = log
        .messages()
        .into_iter()
        .filter_map(|m| match m {
            Message::SectionIndex {
                section_index,
                units,
            } => Some((section_index, units)),
            _ => None,
        })
        .collect();
    assert_eq!(indexes.len(), 2);

    let (index, units) = &indexes[0];
    assert_eq!(*index, 0);
    let texts: Vec<_> = units.iter().map(|u| u.text.as_str()).collect();
    assert_eq!(texts, ["Test Book", "Cover"]);
    assert_eq!(units[1].position.as_str(), "epubcfi(/6/2[title]!/4/4)");

    let (index, units) = &indexes[1];
    assert_eq!(*index, 1);
    let texts: Vec<_> = units.iter().map(|u| u.text.as_str()).collect();
    assert_eq!(texts, ["Chapter 1", "dark"]);
    assert!(units[0].position.as_str().starts_with("epubcfi(/6/4[ch1]!"));
}

#[test]
fn test_title_page_units_stay_on_their_page() {
    let config = ReaderConfig::default();
    let book = epub::from_bytes(&epub_bytes(), &config).unwrap();
    let log = RecordingSink::new();
    let mut session = ReadingSession::new(book, log.clone(), &config).unwrap();

    let relocation = session.engine_mut().display(0).unwrap();
    session.relocated(&relocation);
    let index = session.reindex().expect("title page indexes");
    assert_eq!(index.units.len(), 2);

    for unit in &index.units {
        assert!(!session.should_advance(&unit.position).unwrap(), "{unit:?}");
    }
    assert!(
        !log.messages()
            .iter()
            .any(|m| matches!(m, Message::AdvanceRequested))
    );
}

#[test]
fn test_positions_navigate_back() {
    let config = ReaderConfig::new().with_chars_per_page(12);
    let mut book = epub::from_bytes(&epub_bytes(), &config).unwrap();

    let later = {
        book.display(1).unwrap();
        book.next_page().unwrap()
    };
    book.display(0).unwrap();

    let back = book.display_position(&later.start).unwrap();
    assert_eq!(back, later);
    assert_eq!(book.current_section().unwrap().idref.as_deref(), Some("ch1"));
}
