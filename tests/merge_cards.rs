use cardmerge::{CardKind, CardMergeError, CardMerger, PaperSize};
use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use std::path::Path;

fn write_card(path: &Path, text: &str) {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content = format!("BT /F1 12 Tf 12 228 Td ({}) Tj ET", text).into_bytes();
    let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "MediaBox" => vec![0.into(), 0.into(), 180.into(), 252.into()],
    });
    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save card");
}

fn page_contents(path: &Path) -> Vec<String> {
    let doc = LoDocument::load(path).expect("load merged");
    doc.get_pages()
        .values()
        .map(|id| String::from_utf8(doc.get_page_content(*id).expect("content")).expect("utf8"))
        .collect()
}

#[test]
fn monster_list_merges_in_list_order_next_to_the_list() {
    let cards = tempfile::tempdir().expect("cards dir");
    let monsters = [
        "Goblin (S)",
        "Ogre (L)",
        "Kobold (S)",
        "Owlbear (L)",
        "Wolf",
        "Bandit",
        "Cultist",
        "Zombie",
        "Skeleton",
        "Ghoul",
        "Adult Red Dragon (L)",
    ];
    for name in monsters {
        write_card(&cards.path().join(format!("{name}.pdf")), name);
    }
    write_card(&cards.path().join("!Cover (L).pdf"), "cover");

    let lists = tempfile::tempdir().expect("list dir");
    let list_path = lists.path().join("encounter.txt");
    std::fs::write(
        &list_path,
        "# encounter one\nOwlbear\ngoblin\n\nWOLF\nbandit\ncultist\nzombie\nskeleton\nghoul\nkobold\n// boss\nAdult Red Dragon\n",
    )
    .expect("write list");

    let merger = CardMerger::builder()
        .card_kind(CardKind::Monster)
        .paper_size(PaperSize::Letter)
        .build(cards.path())
        .expect("build");
    assert_eq!(merger.library().len(), 11);

    let summary = merger.merge_list_file(&list_path, None).expect("merge");
    assert_eq!(summary.output, lists.path().join("encounter.pdf"));
    assert_eq!(summary.cards_placed, 10);
    assert_eq!(summary.pages_written, 2);

    let pages = page_contents(&summary.output);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].matches(" Do Q").count(), 9);
    // Tenth card wraps to the top-left cell of the second sheet.
    assert_eq!(pages[1].matches(" Do Q").count(), 1);
    assert!(pages[1].starts_with("q 1 0 0 1 36 522 cm"));
}

#[test]
fn spell_cards_at_reduced_scale_fit_more_per_page() {
    let cards = tempfile::tempdir().expect("cards dir");
    for (level, name) in [(0, "Light"), (1, "Shield"), (3, "Fireball")] {
        write_card(&cards.path().join(format!("{level}_{name}.pdf")), name);
    }
    let list_path = cards.path().join("wizard.txt");
    std::fs::write(&list_path, "Fireball\nShield\nLight\nShield\n").expect("write list");
    let out_path = cards.path().join("custom").join("sheet.pdf");
    std::fs::create_dir_all(out_path.parent().expect("parent")).expect("mkdir");

    let merger = CardMerger::builder()
        .card_kind(CardKind::Spell)
        .paper_size(PaperSize::A4)
        .card_scale(0.5)
        .build(cards.path())
        .expect("build");
    let summary = merger
        .merge_list_file(&list_path, Some(&out_path))
        .expect("merge");
    assert_eq!(summary.cards_placed, 4);
    assert_eq!(summary.pages_written, 1);
    assert_eq!((summary.columns, summary.rows), (6, 6));
    assert_eq!(page_contents(&out_path)[0].matches("q 0.5 0 0 0.5").count(), 4);
}

#[test]
fn list_must_be_a_txt_file() {
    let cards = tempfile::tempdir().expect("cards dir");
    let list_path = cards.path().join("spells.md");
    std::fs::write(&list_path, "Fireball\n").expect("write list");
    let merger = CardMerger::builder().build(cards.path()).expect("build");
    let err = merger
        .merge_list_file(&list_path, None)
        .expect_err("not a txt list");
    assert!(matches!(err, CardMergeError::InvalidCardList(_)));
    assert!(!cards.path().join("spells.pdf").exists());
}
