use crate::error::{CardMergeError, lopdf_err};
use crate::inspect::{inherited_attribute, page_box, resolve};
use crate::layout::{LayoutPlan, OutputPage};
use crate::library::CardSource;
use crate::types::{Pt, Rect};
use lopdf::{
    Dictionary as LoDictionary, Document as LoDocument, Object as LoObject,
    ObjectId as LoObjectId, Stream as LoStream, dictionary,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What happens to annotations (form fields, links) found on card pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationMode {
    /// Copy them onto the output page, moved and scaled along with the card.
    #[default]
    Translate,
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeSummary {
    pub pages_written: usize,
    pub cards_placed: usize,
    pub annotations_copied: usize,
}

/// One source file imported into the output document as a Form XObject.
struct ImportedCard {
    form_id: LoObjectId,
    page_box: Rect,
    annotations: Vec<LoDictionary>,
}

fn import_document_objects(dst: &mut LoDocument, mut src: LoDocument) -> Vec<LoObjectId> {
    let start_id = dst.max_id + 1;
    src.renumber_objects_with(start_id);
    let page_ids: Vec<LoObjectId> = src.get_pages().values().copied().collect();
    if src.max_id > dst.max_id {
        dst.max_id = src.max_id;
    }
    dst.objects.extend(src.objects);
    page_ids
}

fn rect_array(x0: Pt, y0: Pt, x1: Pt, y1: Pt) -> LoObject {
    LoObject::Array(
        [x0, y0, x1, y1]
            .into_iter()
            .map(|v| LoObject::Real(v.to_f32()))
            .collect(),
    )
}

fn page_annotations(doc: &LoDocument, page_id: LoObjectId) -> Vec<LoDictionary> {
    let Ok(page) = doc.get_object(page_id).and_then(LoObject::as_dict) else {
        return Vec::new();
    };
    let Ok(annots) = page.get(b"Annots") else {
        return Vec::new();
    };
    let Ok(annots) = resolve(doc, annots).as_array() else {
        return Vec::new();
    };
    annots
        .iter()
        .filter_map(|annot| resolve(doc, annot).as_dict().ok().cloned())
        .collect()
}

/// Returns the stream dictionary entries and body for a card's form XObject.
/// A single content stream keeps its encoding as is; several streams are
/// decoded and joined, and an encoding lopdf cannot decode is an error.
fn card_form_content(
    doc: &LoDocument,
    page_id: LoObjectId,
    card: &CardSource,
) -> Result<(LoDictionary, Vec<u8>), CardMergeError> {
    let streams: Vec<&LoStream> = doc
        .get_page_contents(page_id)
        .into_iter()
        .filter_map(|id| doc.get_object(id).and_then(LoObject::as_stream).ok())
        .collect();

    if let [stream] = streams.as_slice() {
        let mut encoding = LoDictionary::new();
        for key in [&b"Filter"[..], &b"DecodeParms"[..]] {
            if let Ok(value) = stream.dict.get(key) {
                encoding.set(key.to_vec(), value.clone());
            }
        }
        return Ok((encoding, stream.content.clone()));
    }

    let mut content = Vec::new();
    for stream in streams {
        if stream.dict.get(b"Filter").is_err() {
            content.extend_from_slice(&stream.content);
        } else {
            let decoded = stream
                .decompressed_content()
                .map_err(|err| CardMergeError::InvalidCard {
                    path: card.path.clone(),
                    reason: format!("cannot decode page content stream: {err}"),
                })?;
            content.extend_from_slice(&decoded);
        }
        content.push(b'\n');
    }
    Ok((LoDictionary::new(), content))
}

fn import_card(composed: &mut LoDocument, card: &CardSource) -> Result<ImportedCard, CardMergeError> {
    let src = LoDocument::load(&card.path).map_err(lopdf_err)?;
    if src.is_encrypted() {
        return Err(CardMergeError::InvalidCard {
            path: card.path.clone(),
            reason: "card pdf is encrypted".to_string(),
        });
    }
    let page_ids = import_document_objects(composed, src);
    let &[page_id] = page_ids.as_slice() else {
        return Err(CardMergeError::InvalidCard {
            path: card.path.clone(),
            reason: format!("expected a single page, found {}", page_ids.len()),
        });
    };

    let (encoding, content) = card_form_content(composed, page_id, card)?;
    let bbox = page_box(composed, page_id).unwrap_or(card.page_box);
    let resources = inherited_attribute(composed, page_id, b"Resources")
        .cloned()
        .unwrap_or_else(|| LoObject::Dictionary(LoDictionary::new()));
    let annotations = page_annotations(composed, page_id);

    let mut form = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "FormType" => 1,
        "BBox" => rect_array(bbox.x, bbox.y, bbox.x + bbox.width, bbox.y + bbox.height),
        "Resources" => resources,
    };
    for (key, value) in encoding.iter() {
        form.set(key.clone(), value.clone());
    }
    let form_id = composed.add_object(LoStream::new(form, content));

    Ok(ImportedCard {
        form_id,
        page_box: bbox,
        annotations,
    })
}

/// Moves an annotation rectangle through the same `scale`/`tx`/`ty` transform
/// as the card content. Returns `None` when `/Rect` is absent or malformed.
fn transform_annotation_rect(
    doc: &LoDocument,
    annot: &LoDictionary,
    scale: f32,
    tx: Pt,
    ty: Pt,
) -> Option<LoObject> {
    let values = resolve(doc, annot.get(b"Rect").ok()?).as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut corners = [Pt::ZERO; 4];
    for (idx, (slot, value)) in corners.iter_mut().zip(values).enumerate() {
        let raw = resolve(doc, value).as_float().ok()?;
        let offset = if idx % 2 == 0 { tx } else { ty };
        *slot = offset + Pt::from_f32(raw) * scale;
    }
    Some(rect_array(corners[0], corners[1], corners[2], corners[3]))
}

/// Draws every card of one output page and returns the page's content stream,
/// its XObject resources, and its annotation references.
fn compose_page(
    composed: &mut LoDocument,
    page: OutputPage<'_>,
    page_id: LoObjectId,
    scale: f32,
    slots: &[usize],
    imported: &[ImportedCard],
    mode: AnnotationMode,
) -> (Vec<u8>, LoDictionary, Vec<LoObject>) {
    let mut content = String::new();
    let mut xobjects = LoDictionary::new();
    let mut annots = Vec::new();

    for instruction in page.instructions {
        let slot = slots[instruction.source_index];
        let card = &imported[slot];
        let tx = instruction.x_offset - card.page_box.x * scale;
        let ty = instruction.y_offset - card.page_box.y * scale;
        let form_name = format!("Card{}", slot + 1);
        log::debug!(
            "page {} cell ({}, {}): card {} at {} {}",
            page.page_index + 1,
            instruction.column,
            instruction.row,
            instruction.source_index,
            tx,
            ty
        );

        content.push_str(&format!(
            "q {scale} 0 0 {scale} {tx} {ty} cm /{form_name} Do Q\n"
        ));
        xobjects.set(form_name.into_bytes(), LoObject::Reference(card.form_id));

        if mode == AnnotationMode::Discard {
            continue;
        }
        for annot in &card.annotations {
            let Some(rect) = transform_annotation_rect(composed, annot, scale, tx, ty) else {
                continue;
            };
            let mut annot = annot.clone();
            annot.set("Rect", rect);
            annot.set("Open", false);
            annot.set("P", LoObject::Reference(page_id));
            annots.push(LoObject::Reference(composed.add_object(annot)));
        }
    }

    (content.into_bytes(), xobjects, annots)
}

/// Builds the merged document in memory. Each distinct card file is imported
/// once and drawn as often as the plan places it.
pub fn compose_document(
    cards: &[CardSource],
    plan: &LayoutPlan,
    mode: AnnotationMode,
) -> Result<(LoDocument, ComposeSummary), CardMergeError> {
    if plan.is_empty() {
        return Err(CardMergeError::EmptyInput);
    }
    if let Some(bad) = plan
        .instructions
        .iter()
        .find(|instruction| instruction.source_index >= cards.len())
    {
        return Err(CardMergeError::InvalidLayout(format!(
            "placement references card {} but only {} cards were supplied",
            bad.source_index,
            cards.len()
        )));
    }

    let mut composed = LoDocument::with_version("1.7");
    let mut slot_by_path: BTreeMap<&PathBuf, usize> = BTreeMap::new();
    let mut imported: Vec<ImportedCard> = Vec::new();
    let mut slots: Vec<usize> = Vec::with_capacity(cards.len());

    for card in cards {
        let slot = match slot_by_path.get(&card.path) {
            Some(slot) => *slot,
            None => {
                imported.push(import_card(&mut composed, card)?);
                let slot = imported.len() - 1;
                slot_by_path.insert(&card.path, slot);
                slot
            }
        };
        slots.push(slot);
    }

    let paper = plan.grid.paper;
    let pages_id = composed.new_object_id();
    let mut kids: Vec<LoObject> = Vec::with_capacity(plan.page_count());
    let mut annotations_copied = 0;

    for page in plan.pages() {
        let page_id = composed.new_object_id();
        let (content, xobjects, annots) = compose_page(
            &mut composed,
            page,
            page_id,
            plan.scale,
            &slots,
            &imported,
            mode,
        );
        annotations_copied += annots.len();

        let content_id = composed.add_object(LoStream::new(dictionary! {}, content));
        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
            "MediaBox" => rect_array(Pt::ZERO, Pt::ZERO, paper.width, paper.height),
        };
        if !annots.is_empty() {
            page_dict.set("Annots", annots);
        }
        composed
            .objects
            .insert(page_id, LoObject::Dictionary(page_dict));
        kids.push(LoObject::Reference(page_id));
    }

    let pages_written = kids.len();
    composed.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages_written as i64,
        }),
    );

    let catalog_id = composed.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    composed.trailer.set("Root", catalog_id);
    composed.prune_objects();
    composed.renumber_objects();
    composed.compress();

    Ok((
        composed,
        ComposeSummary {
            pages_written,
            cards_placed: plan.instructions.len(),
            annotations_copied,
        },
    ))
}

/// Composes and saves the merged document. The file is written next to
/// `out_pdf` under a temporary name and renamed into place once complete.
pub fn compose_cards(
    cards: &[CardSource],
    plan: &LayoutPlan,
    out_pdf: &Path,
    mode: AnnotationMode,
) -> Result<ComposeSummary, CardMergeError> {
    let (mut composed, summary) = compose_document(cards, plan, mode)?;

    let parent = out_pdf
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    composed.save_to(&mut staged)?;
    staged.as_file().sync_all()?;
    staged.persist(out_pdf).map_err(|err| err.error)?;

    log::info!(
        "Wrote {} card(s) on {} page(s) to {}",
        summary.cards_placed,
        summary.pages_written,
        out_pdf.display()
    );
    Ok(summary)
}
