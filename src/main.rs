//! cardmerge - lay out single-page card PDFs onto printable sheets.

use cardmerge::{AnnotationMode, CardKind, CardMergeError, CardMerger, MergeSummary, PaperSize};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Merge individual card PDFs into one printable document
#[derive(Parser, Debug)]
#[command(name = "cardmerge")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge spell cards; leading level prefixes like "3_" are ignored in file names
    MergeSpellCards(MergeArgs),
    /// Merge monster cards; trailing size designators like " (L)" are ignored in file names
    MergeMonsterCards(MergeArgs),
    /// Merge cards whose file names match the list exactly
    MergeCards(MergeArgs),
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Path to the .txt card list, one card name per line
    #[arg(short = 'l', long = "card-list", visible_aliases = ["spell-list", "monster-list"])]
    card_list: PathBuf,

    /// Directory containing the individual card pdf files
    #[arg(short = 'd', long = "path-to-pdf-directory")]
    pdf_directory: PathBuf,

    /// Card size scale factor
    #[arg(short = 's', long, default_value_t = 1.0)]
    card_scale: f32,

    /// Output paper size
    #[arg(short = 'p', long, value_enum, ignore_case = true, default_value_t = PaperSize::Letter)]
    paper_size: PaperSize,

    /// Output pdf (default: the card list path with a .pdf extension)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Minimum blank border kept on every side of the sheet, in points
    #[arg(long, default_value_t = 0.0)]
    margin: f32,

    /// Warn about cards that cannot be found instead of failing
    #[arg(long, default_value_t = false)]
    skip_missing: bool,

    /// Do not copy form fields and other annotations from the card pages
    #[arg(long, default_value_t = false)]
    drop_annotations: bool,
}

fn run(kind: CardKind, args: &MergeArgs) -> Result<MergeSummary, CardMergeError> {
    let annotation_mode = if args.drop_annotations {
        AnnotationMode::Discard
    } else {
        AnnotationMode::Translate
    };
    let merger = CardMerger::builder()
        .card_kind(kind)
        .paper_size(args.paper_size)
        .card_scale(args.card_scale)
        .margin_all(args.margin)
        .skip_missing(args.skip_missing)
        .annotation_mode(annotation_mode)
        .build(&args.pdf_directory)?;
    merger.merge_list_file(&args.card_list, args.output.as_deref())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let (kind, args) = match &cli.command {
        Command::MergeSpellCards(args) => (CardKind::Spell, args),
        Command::MergeMonsterCards(args) => (CardKind::Monster, args),
        Command::MergeCards(args) => (CardKind::Plain, args),
    };

    match run(kind, args) {
        Ok(summary) => {
            log::info!(
                "Placed {} card(s) on {} page(s): {}",
                summary.cards_placed,
                summary.pages_written,
                summary.output.display()
            );
        }
        Err(CardMergeError::UnresolvedNames(missing)) => {
            log::error!("Could not find the following {} cards:", missing.len());
            for name in &missing {
                log::error!("  {}", name);
            }
            log::error!("Fix the names or rerun with --skip-missing. Quitting.");
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("{}. Quitting.", e);
            std::process::exit(1);
        }
    }
}
