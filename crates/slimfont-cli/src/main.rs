//! Command-line font subsetter.
//!
//! Reads an OpenType / WOFF / WOFF2 font, retains glyphs for the requested text and writes
//! the subset as a TrueType font or a WOFF2 web font.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use slimfont::{decode_container, Font, FontSubset, Woff2Error};

/// Output font format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// OpenType font with TrueType outlines.
    Ttf,
    /// WOFF2 web font.
    Woff2,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Ttf => "ttf",
            Self::Woff2 => "woff2",
        }
    }
}

/// Subsets a font to the glyphs required to render the provided text.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input font file (.ttf, .otf, .woff or .woff2).
    input: PathBuf,

    /// Text to retain glyphs for. Can be specified multiple times.
    #[arg(short, long)]
    text: Vec<String>,

    /// File with text to retain glyphs for.
    #[arg(long, value_name = "PATH")]
    text_file: Option<PathBuf>,

    /// Output file. Defaults to `<input stem>_subset.<ext>` next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Ttf)]
    format: OutputFormat,
}

impl Args {
    fn chars(&self) -> anyhow::Result<BTreeSet<char>> {
        let mut chars: BTreeSet<char> = self.text.iter().flat_map(|s| s.chars()).collect();
        if let Some(path) = &self.text_file {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed reading text from `{}`", path.display()))?;
            // Line breaks separate text chunks rather than being rendered
            chars.extend(text.chars().filter(|&ch| ch != '\n' && ch != '\r'));
        }
        anyhow::ensure!(
            !chars.is_empty(),
            "no chars to retain; specify `--text` or `--text-file`"
        );
        Ok(chars)
    }

    fn output_path(&self, format: OutputFormat) -> PathBuf {
        if let Some(path) = &self.output {
            return path.clone();
        }
        default_output_path(&self.input, format)
    }

    fn run(&self) -> anyhow::Result<()> {
        let chars = self.chars()?;
        let raw = fs::read(&self.input)
            .with_context(|| format!("failed reading font from `{}`", self.input.display()))?;
        let font_bytes = decode_container(&raw).context("failed decoding font container")?;
        let font = Font::new(&font_bytes).context("failed parsing font")?;
        log::debug!(
            "parsed font {:?} with {} glyphs",
            font.family_name().unwrap_or_default(),
            font.glyph_count()
        );

        let subset = FontSubset::new(font, &chars).context("failed subsetting font")?;
        log::info!(
            "resolved {} of {} requested chars; retained {} glyphs",
            subset.resolved_char_count(),
            subset.requested_char_count(),
            subset.glyph_count()
        );
        if !subset.missing_chars().is_empty() {
            log::warn!("font has no glyphs for chars: {:?}", subset.missing_chars());
        }

        let (format, output) = match self.format {
            OutputFormat::Ttf => (OutputFormat::Ttf, subset.to_truetype()),
            OutputFormat::Woff2 => match subset.to_woff2() {
                Ok(woff2) => (OutputFormat::Woff2, woff2),
                Err(Woff2Error::CompressionUnavailable) => {
                    log::warn!("WOFF2 compression is unavailable; writing TrueType output instead");
                    (OutputFormat::Ttf, subset.to_truetype())
                }
                Err(err) => return Err(err).context("failed creating WOFF2 font"),
            },
        };

        let output_path = self.output_path(format);
        fs::write(&output_path, &output)
            .with_context(|| format!("failed writing subset to `{}`", output_path.display()))?;
        log::info!(
            "wrote {} bytes to `{}` (input: {} bytes)",
            output.len(),
            output_path.display(),
            raw.len()
        );
        Ok(())
    }
}

fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let file_name = format!("{stem}_subset.{}", format.extension());
    input.with_file_name(file_name)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    Args::parse().run()
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn args_are_parsed() {
        let args = Args::try_parse_from([
            "slimfont",
            "fonts/Roboto.woff2",
            "--text",
            "Hello",
            "-t",
            "world",
            "--format",
            "woff2",
        ])
        .unwrap();
        assert_eq!(args.input, Path::new("fonts/Roboto.woff2"));
        assert_eq!(args.format, OutputFormat::Woff2);
        let chars: String = args.chars().unwrap().into_iter().collect();
        assert_eq!(chars, "Hdelorw");

        let args = Args::try_parse_from(["slimfont", "font.ttf"]).unwrap();
        assert_eq!(args.format, OutputFormat::Ttf);
        let err = args.chars().unwrap_err();
        assert!(err.to_string().contains("no chars"), "{err}");
    }

    #[test]
    fn default_output_path_is_next_to_input() {
        let path = default_output_path(Path::new("fonts/Roboto-Regular.woff2"), OutputFormat::Ttf);
        assert_eq!(path, Path::new("fonts/Roboto-Regular_subset.ttf"));
        let path = default_output_path(Path::new("font.ttf"), OutputFormat::Woff2);
        assert_eq!(path, Path::new("font_subset.woff2"));
    }

    #[test]
    fn explicit_output_path_is_used() {
        let args =
            Args::try_parse_from(["slimfont", "font.ttf", "-t", "a", "-o", "out/subset.woff2"])
                .unwrap();
        assert_eq!(
            args.output_path(OutputFormat::Woff2),
            Path::new("out/subset.woff2")
        );
    }

    #[test]
    fn text_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("text.txt");
        fs::write(&text_path, "ab\r\nba\n").unwrap();
        let args = Args::try_parse_from([
            OsStr::new("slimfont"),
            OsStr::new("font.ttf"),
            OsStr::new("--text-file"),
            text_path.as_os_str(),
        ])
        .unwrap();
        let chars: String = args.chars().unwrap().into_iter().collect();
        assert_eq!(chars, "ab");
    }
}
