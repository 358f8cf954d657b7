//! Merges per-document artifacts behind a generated index page.

use crate::error::{Error, Result};
use crate::render::PageArtifact;
use crate::url_norm::DocumentList;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId, SaveOptions, Stream, dictionary};

pub const DOCUMENT_TITLE: &str = "pagebind document";
pub const DOCUMENT_AUTHOR: &str = "pagebind";

const INDEX_HEADING: &str = "Table of Contents";

// A4 in PDF points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;

const INDEX_X: i64 = 50;
const INDEX_TOP: i64 = 792;
const INDEX_FONT_SIZE: i64 = 12;
const INDEX_LEADING: i64 = 14;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in malformed input.
const MAX_TREE_DEPTH: usize = 64;

/// The final output: index page first, then every artifact in list order.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Lines drawn on the index page.
pub fn index_lines(list: &DocumentList) -> Vec<String> {
    let mut lines = vec![INDEX_HEADING.to_string()];
    lines.extend(
        list.iter()
            .enumerate()
            .map(|(i, url)| format!("{}. {}", i + 1, url)),
    );
    lines
}

/// Number of index lines whose baseline still lands on the page.
pub fn index_capacity() -> usize {
    (INDEX_TOP / INDEX_LEADING) as usize + 1
}

/// Build the final document. `artifacts[i]` must belong to the `i`th list entry.
///
/// Nothing is returned unless every artifact was merged.
pub fn assemble(list: &DocumentList, artifacts: &[PageArtifact]) -> Result<AssembledDocument> {
    if artifacts.len() != list.len() {
        return Err(Error::assembly(format!(
            "expected {} artifacts, got {}",
            list.len(),
            artifacts.len()
        )));
    }
    if let Some((url, artifact)) = list
        .iter()
        .zip(artifacts)
        .find(|(url, artifact)| *url != artifact.source)
    {
        return Err(Error::assembly(format!(
            "artifact for {} found where {} was expected",
            artifact.source, url
        )));
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let lines = index_lines(list);
    if lines.len() > index_capacity() {
        ::log::warn!(
            "Index lists {} entries but only {} lines fit on its page; the rest are not drawn",
            list.len(),
            index_capacity() - 1
        );
    }
    let index_id = add_index_page(&mut doc, pages_id, &lines).map_err(Error::assembly)?;
    let mut kids = vec![Object::Reference(index_id)];

    for artifact in artifacts {
        append_artifact(&mut doc, pages_id, artifact, &mut kids).map_err(|e| {
            Error::assembly(format!("could not merge {}: {}", artifact.source, e))
        })?;
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(DOCUMENT_TITLE),
        "Author" => Object::string_literal(DOCUMENT_AUTHOR),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    // Flate every content stream, then pack the remaining objects into object streams
    doc.compress();
    let options = SaveOptions::builder()
        .use_object_streams(true)
        .use_xref_streams(true)
        .build();
    let mut bytes = Vec::new();
    doc.save_with_options(&mut bytes, options)
        .map_err(Error::assembly)?;

    Ok(AssembledDocument { bytes, page_count })
}

/// Single-page index listing. Text past the bottom edge is emitted off-page.
fn add_index_page(
    doc: &mut Document,
    pages_id: ObjectId,
    lines: &[String],
) -> lopdf::Result<ObjectId> {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), INDEX_FONT_SIZE.into()]),
        Operation::new("TL", vec![INDEX_LEADING.into()]),
        Operation::new("Td", vec![INDEX_X.into(), INDEX_TOP.into()]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(line))],
        ));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Contents" => content_id,
        "Resources" => resources_id,
    }))
}

/// Encode `text` for the index font. Characters WinAnsi cannot represent become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let encoding = Encoding::SimpleEncoding(b"WinAnsiEncoding");
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let before = out.len();
        encoding.write_to_bytes(c.encode_utf8(&mut buf), &mut out);
        if out.len() == before {
            out.push(b'?');
        }
    }
    out
}

/// Copy every page of `artifact` into `doc`, preserving its page order.
fn append_artifact(
    doc: &mut Document,
    pages_id: ObjectId,
    artifact: &PageArtifact,
    kids: &mut Vec<Object>,
) -> lopdf::Result<()> {
    let mut source = Document::load_mem(&artifact.bytes)?;
    source.renumber_objects_with(doc.max_id + 1);

    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    for &page_id in &page_ids {
        inherit_page_attributes(&mut source, page_id)?;
    }

    doc.max_id = doc.max_id.max(source.max_id);
    for (id, object) in std::mem::take(&mut source.objects) {
        if is_page_tree_or_outline(&object) {
            continue;
        }
        doc.objects.insert(id, object);
    }

    for page_id in page_ids {
        doc.get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Parent", pages_id);
        kids.push(Object::Reference(page_id));
    }
    Ok(())
}

/// Structural objects of a source document that the merged document replaces.
fn is_page_tree_or_outline(object: &Object) -> bool {
    let name = match object {
        Object::Dictionary(dict) => dict.get(b"Type").and_then(Object::as_name),
        _ => return false,
    };
    matches!(
        name,
        Ok(b"Catalog" | b"Pages" | b"Outlines" | b"Outline")
    )
}

/// Copy inherited attributes onto the page, since its original page tree is dropped.
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) -> lopdf::Result<()> {
    let page = doc.get_dictionary(page_id)?;
    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    let mut inherited = Vec::new();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        let node = doc.get_dictionary(parent_id)?;
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}
