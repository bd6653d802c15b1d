use std::fs;
use std::io::Write;
use tempfile::TempDir;

use docchat_core::loader::DocumentLoader;

fn write_docx(path: &std::path::Path, body: &str) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default()).unwrap();
    let xml = format!("<w:document><w:body><w:p><w:r><w:t>{body}</w:t></w:r></w:p></w:body></w:document>");
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[test]
fn load_directory_reads_supported_formats_recursively() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "The sky is blue.").unwrap();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("nested/b.md"), "# Notes\nGrass is green.").unwrap();
    write_docx(&dir.join("c.docx"), "Water is wet.");

    let docs = DocumentLoader::new(dir).load_directory();

    let sources: Vec<&str> = docs.iter().map(|d| d.source.as_str()).collect();
    assert_eq!(sources, vec!["a.txt", "c.docx", "b.md"], "sorted by full path");
    assert_eq!(docs[0].text, "The sky is blue.");
    assert_eq!(docs[1].text, "Water is wet.");
    assert!(docs[2].path.ends_with("nested/b.md"));
}

#[test]
fn unsupported_and_broken_files_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("keep.txt"), "kept").unwrap();
    fs::write(dir.join("table.csv"), "a,b\n1,2").unwrap();
    fs::write(dir.join("broken.docx"), "not a zip archive").unwrap();

    let loader = DocumentLoader::new(dir);
    assert!(loader.load_file(&dir.join("table.csv")).is_none());
    assert!(loader.load_file(&dir.join("broken.docx")).is_none());
    assert!(loader.load_file(&dir.join("missing.txt")).is_none());

    let docs = loader.load_directory();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source, "keep.txt");
}

#[test]
fn invalid_utf8_text_is_decoded_lossily() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("latin1.txt");
    fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();
    let doc = DocumentLoader::new(tmp.path()).load_file(&path).expect("loaded");
    assert!(doc.text.starts_with("caf"));
    assert!(doc.text.contains('\u{FFFD}'));
}

#[test]
fn missing_directory_yields_no_documents() {
    let tmp = TempDir::new().unwrap();
    let docs = DocumentLoader::new(tmp.path().join("nope")).load_directory();
    assert!(docs.is_empty());
}
