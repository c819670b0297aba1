use crate::types::Rect;
use lopdf::{Document as LoDocument, Object as LoObject, ObjectId as LoObjectId};
use std::path::Path;

// Guards the Parent walk against malformed page trees that loop.
const MAX_PAGE_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardInspectErrorCode {
    PdfParseFailed,
    PdfEncryptedUnsupported,
    PdfEmptyOrNoPages,
    PdfMultiplePages,
    PdfMissingPageBox,
    PdfIoError,
}

impl CardInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            CardInspectErrorCode::PdfEncryptedUnsupported => "PDF_ENCRYPTED_UNSUPPORTED",
            CardInspectErrorCode::PdfEmptyOrNoPages => "PDF_EMPTY_OR_NO_PAGES",
            CardInspectErrorCode::PdfMultiplePages => "PDF_MULTIPLE_PAGES",
            CardInspectErrorCode::PdfMissingPageBox => "PDF_MISSING_PAGE_BOX",
            CardInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInspectError {
    pub code: CardInspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for CardInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for CardInspectError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    /// CropBox, falling back to MediaBox, of the first page.
    pub page_box: Option<Rect>,
}

pub fn inspect_card_bytes(bytes: &[u8]) -> Result<CardInspectReport, CardInspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| CardInspectError {
        code: CardInspectErrorCode::PdfParseFailed,
        message: err.to_string(),
    })?;

    let pages = pdf.get_pages();
    let page_box = pages
        .values()
        .next()
        .and_then(|page_id| page_box(&pdf, *page_id));

    Ok(CardInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pages.len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        page_box,
    })
}

pub fn inspect_card_path(path: &Path) -> Result<CardInspectReport, CardInspectError> {
    let data = std::fs::read(path).map_err(|err| CardInspectError {
        code: CardInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_card_bytes(&data)
}

pub fn card_compatibility_issues(report: &CardInspectReport) -> Vec<CardInspectErrorCode> {
    let mut issues = Vec::new();
    if report.encrypted {
        issues.push(CardInspectErrorCode::PdfEncryptedUnsupported);
    }
    match report.page_count {
        0 => issues.push(CardInspectErrorCode::PdfEmptyOrNoPages),
        1 => {}
        _ => issues.push(CardInspectErrorCode::PdfMultiplePages),
    }
    if report.page_count > 0 && report.page_box.is_none() {
        issues.push(CardInspectErrorCode::PdfMissingPageBox);
    }
    issues
}

/// Accepts exactly one unencrypted page with a usable page box and returns that box.
pub fn require_single_card(report: &CardInspectReport) -> Result<Rect, CardInspectError> {
    if let Some(issue) = card_compatibility_issues(report).into_iter().next() {
        let message = match issue {
            CardInspectErrorCode::PdfEncryptedUnsupported => {
                "encrypted card pdfs are not supported".to_string()
            }
            CardInspectErrorCode::PdfEmptyOrNoPages => "pdf has no pages".to_string(),
            CardInspectErrorCode::PdfMultiplePages => {
                format!("expected a single page, found {}", report.page_count)
            }
            CardInspectErrorCode::PdfMissingPageBox => "page has no media box".to_string(),
            CardInspectErrorCode::PdfParseFailed | CardInspectErrorCode::PdfIoError => {
                issue.as_str().to_string()
            }
        };
        return Err(CardInspectError {
            code: issue,
            message,
        });
    }
    report.page_box.ok_or_else(|| CardInspectError {
        code: CardInspectErrorCode::PdfMissingPageBox,
        message: "page has no media box".to_string(),
    })
}

pub(crate) fn resolve<'a>(doc: &'a LoDocument, obj: &'a LoObject) -> &'a LoObject {
    let mut current = obj;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        match current {
            LoObject::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

/// Looks `key` up on the page, then on its ancestors in the page tree.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a LoDocument,
    page_id: LoObjectId,
    key: &[u8],
) -> Option<&'a LoObject> {
    let mut node_id = page_id;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = doc.get_object(node_id).ok()?.as_dict().ok()?;
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        node_id = node.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

pub(crate) fn rect_from_object(doc: &LoDocument, obj: &LoObject) -> Option<Rect> {
    let values = resolve(doc, obj).as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut corners = [0.0f32; 4];
    for (slot, value) in corners.iter_mut().zip(values) {
        *slot = resolve(doc, value).as_float().ok()?;
    }
    let rect = Rect::from_corners(corners[0], corners[1], corners[2], corners[3]);
    if rect.width.to_milli_i64() <= 0 || rect.height.to_milli_i64() <= 0 {
        return None;
    }
    Some(rect)
}

pub(crate) fn page_box(doc: &LoDocument, page_id: LoObjectId) -> Option<Rect> {
    [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .into_iter()
        .filter_map(|key| inherited_attribute(doc, page_id, key))
        .find_map(|obj| rect_from_object(doc, obj))
}

#[cfg(test)]
pub(crate) mod test_pdf {
    use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};

    /// Builds an unencrypted PDF with `pages` copies of a text page of the given size.
    pub(crate) fn make_card_pdf_bytes(text: &str, width: i64, height: i64, pages: usize) -> Vec<u8> {
        let mut doc = LoDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids = Vec::with_capacity(pages);
        for _ in 0..pages {
            let content = format!("BT /F1 12 Tf 12 {} Td ({}) Tj ET", height - 24, text).into_bytes();
            let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            });
            kids.push(LoObject::Reference(page_id));
        }
        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        doc.objects.insert(pages_id, LoObject::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save");
        out
    }

    pub(crate) fn write_card_pdf(path: &std::path::Path, text: &str) {
        std::fs::write(path, make_card_pdf_bytes(text, 180, 252, 1)).expect("write card pdf");
    }
}
