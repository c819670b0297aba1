//! Card directory scanning and name resolution.

use crate::error::CardMergeError;
use crate::inspect::{inspect_card_path, require_single_card};
use crate::types::Rect;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

static SPELL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d*_").expect("valid spell prefix regex"));
static MONSTER_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([LS]\)$").expect("valid monster suffix regex"));

/// Maps a file path to the card name it provides, or `None` to ignore the file.
pub type NameFilter = Arc<dyn Fn(&Path) -> Option<String> + Send + Sync>;

/// A resolved, single-page card file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSource {
    pub name: String,
    pub path: PathBuf,
    pub page_box: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardKind {
    /// File stem is the card name.
    #[default]
    Plain,
    /// Leading spell level prefix such as `3_` is ignored.
    Spell,
    /// Trailing size designator such as ` (L)` is ignored.
    Monster,
}

impl CardKind {
    pub fn name_filter(self) -> NameFilter {
        match self {
            CardKind::Plain => Arc::new(card_name),
            CardKind::Spell => Arc::new(spell_name),
            CardKind::Monster => Arc::new(monster_name),
        }
    }
}

fn card_stem(path: &Path) -> Option<&str> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("pdf") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('!') {
        return None;
    }
    Some(stem)
}

pub fn card_name(path: &Path) -> Option<String> {
    card_stem(path).map(str::to_lowercase)
}

pub fn spell_name(path: &Path) -> Option<String> {
    card_stem(path).map(|stem| SPELL_PREFIX_RE.replace(stem, "").to_lowercase())
}

pub fn monster_name(path: &Path) -> Option<String> {
    card_stem(path).map(|stem| MONSTER_SUFFIX_RE.replace(stem, "").to_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub cards: Vec<CardSource>,
    pub unresolved: Vec<String>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Lookup from normalized card name to card file.
#[derive(Debug, Clone, Default)]
pub struct CardLibrary {
    dir: PathBuf,
    by_name: BTreeMap<String, PathBuf>,
}

impl CardLibrary {
    pub fn scan<F>(dir: &Path, filter: F) -> Result<Self, CardMergeError>
    where
        F: Fn(&Path) -> Option<String>,
    {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();
        for path in paths {
            let Some(name) = filter(&path) else {
                continue;
            };
            if let Some(existing) = by_name.get(&name) {
                log::debug!(
                    "card name '{}' from {} already provided by {}",
                    name,
                    path.display(),
                    existing.display()
                );
                continue;
            }
            by_name.insert(name, path);
        }

        log::info!("Found {} card files in {}", by_name.len(), dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            by_name,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn path_for(&self, name: &str) -> Option<&Path> {
        self.by_name.get(name).map(PathBuf::as_path)
    }

    /// Resolves `names` in order. Missing names and files that are not a single
    /// readable page end up in `unresolved`; each file is inspected once.
    pub fn resolve(&self, names: &[String]) -> Resolution {
        let mut inspected: BTreeMap<&Path, Option<Rect>> = BTreeMap::new();
        let mut resolution = Resolution::default();

        for name in names {
            let Some(path) = self.path_for(name) else {
                resolution.unresolved.push(name.clone());
                continue;
            };
            let page_box = *inspected.entry(path).or_insert_with(|| {
                match inspect_card_path(path).and_then(|report| require_single_card(&report)) {
                    Ok(page_box) => Some(page_box),
                    Err(err) => {
                        log::warn!("Skipping {}: {}", path.display(), err);
                        None
                    }
                }
            });
            match page_box {
                Some(page_box) => resolution.cards.push(CardSource {
                    name: name.clone(),
                    path: path.to_path_buf(),
                    page_box,
                }),
                None => resolution.unresolved.push(name.clone()),
            }
        }
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::test_pdf::{make_card_pdf_bytes, write_card_pdf};

    #[test]
    fn card_name_ignores_non_pdf_and_bang_files() {
        assert_eq!(card_name(Path::new("dir/Fireball.pdf")), Some("fireball".to_string()));
        assert_eq!(card_name(Path::new("dir/Fireball.txt")), None);
        assert_eq!(card_name(Path::new("dir/!Index.pdf")), None);
        assert_eq!(card_name(Path::new("dir/noext")), None);
    }

    #[test]
    fn spell_name_strips_level_prefix() {
        assert_eq!(
            spell_name(Path::new("cards/3_Fireball.pdf")),
            Some("fireball".to_string())
        );
        assert_eq!(
            spell_name(Path::new("cards/_Light.pdf")),
            Some("light".to_string())
        );
        assert_eq!(
            spell_name(Path::new("cards/Mage Hand.pdf")),
            Some("mage hand".to_string())
        );
        // Only the leading prefix goes.
        assert_eq!(
            spell_name(Path::new("cards/0_Tasha_s Laughter.pdf")),
            Some("tasha_s laughter".to_string())
        );
    }

    #[test]
    fn monster_name_strips_size_suffix() {
        assert_eq!(
            monster_name(Path::new("m/Adult Red Dragon (L).pdf")),
            Some("adult red dragon".to_string())
        );
        assert_eq!(
            monster_name(Path::new("m/Goblin(S).pdf")),
            Some("goblin".to_string())
        );
        assert_eq!(
            monster_name(Path::new("m/Ogre (L) Chieftain.pdf")),
            Some("ogre (l) chieftain".to_string())
        );
        assert_eq!(monster_name(Path::new("m/!Cover (L).pdf")), None);
    }

    #[test]
    fn card_kind_selects_filter() {
        let path = Path::new("x/2_Shield (S).pdf");
        assert_eq!(
            (CardKind::Plain.name_filter())(path),
            Some("2_shield (s)".to_string())
        );
        assert_eq!(
            (CardKind::Spell.name_filter())(path),
            Some("shield (s)".to_string())
        );
        assert_eq!(
            (CardKind::Monster.name_filter())(path),
            Some("2_shield".to_string())
        );
    }

    #[test]
    fn scan_keeps_first_file_for_duplicate_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card_pdf(&dir.path().join("1_Shield.pdf"), "A");
        write_card_pdf(&dir.path().join("2_Shield.pdf"), "B");
        write_card_pdf(&dir.path().join("notes.txt"), "C");
        std::fs::create_dir(dir.path().join("nested.pdf")).expect("mkdir");

        let library = CardLibrary::scan(dir.path(), spell_name).expect("scan");
        assert_eq!(library.dir(), dir.path());
        assert_eq!(library.len(), 1);
        assert_eq!(
            library.path_for("shield"),
            Some(dir.path().join("1_Shield.pdf").as_path())
        );
    }

    #[test]
    fn scan_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = CardLibrary::scan(&dir.path().join("absent"), card_name).expect_err("missing");
        assert!(matches!(err, CardMergeError::Io(_)));
    }

    #[test]
    fn resolve_preserves_order_and_reports_unresolved() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_card_pdf(&dir.path().join("1_Fireball.pdf"), "FIREBALL");
        write_card_pdf(&dir.path().join("0_Light.pdf"), "LIGHT");
        std::fs::write(
            dir.path().join("2_Twin.pdf"),
            make_card_pdf_bytes("TWIN", 180, 252, 2),
        )
        .expect("write");

        let library = CardLibrary::scan(dir.path(), spell_name).expect("scan");
        let names: Vec<String> = ["light", "wish", "fireball", "twin", "light"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let resolution = library.resolve(&names);

        let resolved: Vec<&str> = resolution.cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(resolved, vec!["light", "fireball", "light"]);
        assert_eq!(resolution.unresolved, vec!["wish".to_string(), "twin".to_string()]);
        assert!(!resolution.is_complete());
        assert_eq!(resolution.cards[0].path, dir.path().join("0_Light.pdf"));
        assert_eq!(resolution.cards[0].page_box.size(), crate::layout::nominal_card_size());
    }
}
