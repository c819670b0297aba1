use crate::types::Size;
use std::fmt;
use std::str::FromStr;

/// Output sheet formats, sized in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum PaperSize {
    #[default]
    Letter,
    Legal,
    A4,
}

impl PaperSize {
    pub const ALL: [PaperSize; 3] = [PaperSize::Letter, PaperSize::Legal, PaperSize::A4];

    pub fn size(self) -> Size {
        match self {
            PaperSize::Letter => Size::from_points(612.0, 792.0),
            PaperSize::Legal => Size::from_points(612.0, 1008.0),
            PaperSize::A4 => Size::from_points(595.0, 842.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaperSize::Letter => "letter",
            PaperSize::Legal => "legal",
            PaperSize::A4 => "a4",
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        PaperSize::ALL
            .into_iter()
            .find(|p| p.as_str() == v)
            .ok_or_else(|| format!("unknown paper size: {value} (expected letter, legal or a4)"))
    }
}
