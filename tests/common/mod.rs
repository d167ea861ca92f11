//! EPUB fixtures built in memory

#![allow(dead_code)]

use std::io::{Cursor, Write};

use image::{DynamicImage, ImageFormat, RgbImage};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Zip entries in insertion order; `mimetype` goes first, stored
#[derive(Default)]
pub struct EpubBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self::default().file("META-INF/container.xml", CONTAINER)
    }

    pub fn file(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.files.push((name.to_string(), content.as_ref().to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(
            "mimetype",
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        for (name, content) in self.files {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(&content).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

pub fn xhtml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Fixture</title></head>
<body>{}</body>
</html>"#,
        body
    )
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Two chapters, a nested NAV entry pointing at a fragment, one inline image
/// that is also the cover.
pub fn sample_epub() -> Vec<u8> {
    let opf = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="pub-id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="pub-id">urn:uuid:1b4e28ba-2fa1-11d2-883f-0016d3cca427</dc:identifier>
    <dc:title>Sample Book</dc:title>
    <dc:creator>Ada Writer</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="c1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="pic" href="images/pic.png" media-type="image/png" properties="cover-image"/>
  </manifest>
  <spine>
    <itemref idref="c1"/>
    <itemref idref="c2"/>
  </spine>
</package>"#;

    let nav = xhtml(
        r#"<nav epub:type="toc"><ol>
  <li><a href="text/ch1.xhtml">Chapter One</a>
    <ol><li><a href="text/ch1.xhtml#b">Part B</a></li></ol>
  </li>
  <li><a href="text/ch2.xhtml">Chapter Two</a></li>
</ol></nav>"#,
    );
    let ch1 = xhtml(
        r#"<h1>Chapter One</h1>
<p>First paragraph.</p>
<h2 id="b">Part B</h2>
<p>Look <img src="../images/pic.png" alt="pic"/> here.</p>"#,
    );
    let ch2 = xhtml("<h1>Chapter Two</h1>\n<p>Last words here.</p>");

    EpubBuilder::new()
        .file("OEBPS/content.opf", opf)
        .file("OEBPS/nav.xhtml", nav)
        .file("OEBPS/text/ch1.xhtml", ch1)
        .file("OEBPS/text/ch2.xhtml", ch2)
        .file("OEBPS/images/pic.png", png(3, 2))
        .build()
}
