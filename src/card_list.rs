use crate::error::CardMergeError;
use std::path::{Path, PathBuf};

const COMMENT_PREFIXES: [char; 3] = ['#', '!', '/'];

/// One card name per line, lowercased, in file order. Duplicates are kept.
pub fn parse_card_list(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.starts_with(COMMENT_PREFIXES))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn read_card_list(path: &Path) -> Result<Vec<String>, CardMergeError> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
        return Err(CardMergeError::InvalidCardList(format!(
            "card list must be a .txt file: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(CardMergeError::InvalidCardList(format!(
            "could not find card list {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)?;
    Ok(parse_card_list(&text))
}

/// The merged document sits next to the list with the same base name.
pub fn default_output_path(list_path: &Path) -> PathBuf {
    list_path.with_extension("pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let text = "# level 1\nMagic Missile\n\n   \n!ignored\n// also ignored\nShield  \r\nmagic missile\n";
        assert_eq!(
            parse_card_list(text),
            vec![
                "magic missile".to_string(),
                "shield".to_string(),
                "magic missile".to_string()
            ]
        );
    }

    #[test]
    fn indented_hash_is_a_name() {
        assert_eq!(parse_card_list("  #1 fan\n"), vec!["#1 fan".to_string()]);
    }

    #[test]
    fn read_requires_txt_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("spells.csv");
        std::fs::write(&path, "Fireball\n").expect("write");
        let err = read_card_list(&path).expect_err("wrong extension");
        assert!(matches!(err, CardMergeError::InvalidCardList(_)));
        assert!(err.to_string().contains(".txt"));
    }

    #[test]
    fn read_reports_missing_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_card_list(&dir.path().join("absent.txt")).expect_err("missing");
        assert!(err.to_string().contains("could not find card list"));
    }

    #[test]
    fn read_parses_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("party.txt");
        std::fs::write(&path, "Goblin\n# boss\nAdult Red Dragon\n").expect("write");
        assert_eq!(
            read_card_list(&path).expect("read"),
            vec!["goblin".to_string(), "adult red dragon".to_string()]
        );
        assert_eq!(default_output_path(&path), dir.path().join("party.pdf"));
    }
}
