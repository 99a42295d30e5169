//! Page tree manipulation.
//!
//! Appended pages are re-parented directly under the merged document's root
//! `Pages` node. Attributes they used to inherit from their old page tree
//! (resources, boxes, rotation) are copied onto the page itself first.

use lopdf::{Document, Object, ObjectId};

use crate::error::{MergeError, Result};

/// Page attributes a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page trees deeper than this are treated as corrupt.
const MAX_TREE_DEPTH: usize = 64;

/// Object id of the root `Pages` node.
pub fn root_pages_id(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .map_err(|e| MergeError::merge_failed(format!("Failed to get catalog: {e}")))?
        .get(b"Pages")
        .and_then(|p| p.as_reference())
        .map_err(|e| MergeError::merge_failed(format!("Failed to get pages reference: {e}")))
}

/// Attach `page_ids` (already present in `merged.objects`) to the end of the
/// root page tree.
pub fn append_pages(merged: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let pages_id = root_pages_id(merged)?;

    for &page_id in page_ids {
        let inherited = inherited_attributes(merged, page_id);

        let page = merged
            .get_dictionary_mut(page_id)
            .map_err(|e| MergeError::merge_failed(format!("Failed to get page: {e}")))?;

        for (key, value) in inherited {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(pages_id));
    }

    let pages_dict = merged
        .get_dictionary_mut(pages_id)
        .map_err(|e| MergeError::merge_failed(format!("Failed to get pages object: {e}")))?;

    let kids = pages_dict
        .get_mut(b"Kids")
        .map_err(|_| MergeError::merge_failed("Pages dictionary missing Kids array"))?;

    if let Object::Array(kids_array) = kids {
        kids_array.extend(page_ids.iter().map(|&id| Object::Reference(id)));
    } else {
        return Err(MergeError::merge_failed("Kids is not an array"));
    }

    let current_count = pages_dict.get(b"Count").and_then(|c| c.as_i64()).unwrap_or(0);
    pages_dict.set("Count", Object::Integer(current_count + page_ids.len() as i64));

    Ok(())
}

/// Collect inheritable attributes the page does not define itself, nearest
/// ancestor first.
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();

    let Ok(page) = doc.get_dictionary(page_id) else {
        return found;
    };

    let mut parent = page.get(b"Parent").and_then(|p| p.as_reference()).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(node) = parent.and_then(|id| doc.get_dictionary(id).ok()) else {
            break;
        };

        for key in INHERITABLE {
            if page.has(key) || found.iter().any(|(k, _)| k == key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                found.push((key.to_vec(), value.clone()));
            }
        }

        parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }

    found
}

/// Flate-compress the content streams of every page.
///
/// Streams that already carry a filter, or would not get smaller, are left
/// as they are. Returns the number of streams visited.
pub fn compress_page_contents(doc: &mut Document) -> Result<usize> {
    let content_ids: Vec<ObjectId> = doc
        .get_pages()
        .into_values()
        .flat_map(|page_id| doc.get_page_contents(page_id))
        .collect();

    for &id in &content_ids {
        if let Ok(Object::Stream(stream)) = doc.get_object_mut(id) {
            stream.compress()?;
        }
    }

    Ok(content_ids.len())
}

/// Get the number of pages in a document.
pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}
