//! Shared test fixtures: a builder for synthetic TrueType fonts and output validation.

use std::{collections::BTreeSet, env, io::Write, ops, process::Command, sync::OnceLock};

use allsorts::{binary::read::ReadScope, font::MatchingPresentation, font_data::FontData};
use test_casing::{test_casing, Product};

use crate::{
    write::{write_cmap, FontWriter},
    Font, FontSubset, ParseErrorKind, TableTag,
};

/// Glyph in a synthetic font.
#[derive(Debug, Clone)]
pub(crate) enum TestGlyph {
    Empty,
    /// Single contour consisting of on-curve points.
    Simple(Vec<(i16, i16)>),
    /// Composite glyph with the specified component glyphs.
    Composite(Vec<u16>),
}

impl TestGlyph {
    pub(crate) fn triangle() -> Self {
        Self::Simple(vec![(0, 0), (100, 0), (50, 100)])
    }

    pub(crate) fn square() -> Self {
        Self::Simple(vec![(0, 0), (100, 0), (100, 100), (0, 100)])
    }

    /// Glyph with many points, used to make `glyf` large.
    pub(crate) fn zigzag(point_count: u16) -> Self {
        let points = (0..point_count).map(|i| {
            let x = i16::try_from(i % 1_000).unwrap();
            (x, if i % 2 == 0 { 0 } else { 100 })
        });
        Self::Simple(points.collect())
    }

    fn write(&self, buffer: &mut Vec<u8>) {
        match self {
            Self::Empty => { /* empty glyphs have no data */ }
            Self::Simple(points) => {
                let x_min = points.iter().map(|&(x, _)| x).min().unwrap();
                let x_max = points.iter().map(|&(x, _)| x).max().unwrap();
                let y_min = points.iter().map(|&(_, y)| y).min().unwrap();
                let y_max = points.iter().map(|&(_, y)| y).max().unwrap();
                for value in [1, x_min, y_min, x_max, y_max] {
                    buffer.extend_from_slice(&value.to_be_bytes());
                }
                let last_point = u16::try_from(points.len() - 1).unwrap();
                buffer.extend_from_slice(&last_point.to_be_bytes());
                buffer.extend_from_slice(&0_u16.to_be_bytes()); // instructionLength
                buffer.extend(points.iter().map(|_| 0x01_u8)); // on-curve, 16-bit deltas

                let mut prev = (0_i16, 0_i16);
                let deltas: Vec<_> = points
                    .iter()
                    .map(|&(x, y)| {
                        let delta = (x - prev.0, y - prev.1);
                        prev = (x, y);
                        delta
                    })
                    .collect();
                for &(dx, _) in &deltas {
                    buffer.extend_from_slice(&dx.to_be_bytes());
                }
                for &(_, dy) in &deltas {
                    buffer.extend_from_slice(&dy.to_be_bytes());
                }
            }
            Self::Composite(components) => {
                for value in [-1_i16, 0, 0, 200, 100] {
                    buffer.extend_from_slice(&value.to_be_bytes());
                }
                for (i, &glyph_idx) in components.iter().enumerate() {
                    // ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES
                    let mut flags = 0x_0003_u16;
                    if i + 1 < components.len() {
                        flags |= 0x_0020; // MORE_COMPONENTS
                    }
                    buffer.extend_from_slice(&flags.to_be_bytes());
                    buffer.extend_from_slice(&glyph_idx.to_be_bytes());
                    let dx = i16::try_from(i * 100).unwrap();
                    buffer.extend_from_slice(&dx.to_be_bytes());
                    buffer.extend_from_slice(&0_i16.to_be_bytes());
                }
            }
        }
    }
}

/// Builder for synthetic TrueType fonts. The missing glyph (a square) is always present.
#[derive(Debug)]
pub(crate) struct TestFontBuilder {
    glyphs: Vec<TestGlyph>,
    char_map: Vec<(char, u16)>,
    glyph_names: bool,
    hinting: bool,
    cff_outlines: bool,
    extra_tables: Vec<(TableTag, Vec<u8>)>,
}

impl TestFontBuilder {
    pub(crate) const UNITS_PER_EM: u16 = 1_000;
    /// Value of all outline-related `maxp` fields, which is larger than actual values.
    pub(crate) const MAXP_OUTLINE_VALUE: u16 = 0x7fff;
    const NOTDEF_ADVANCE: u16 = 500;
    const ADVANCE: u16 = 600;

    pub(crate) fn new() -> Self {
        Self {
            glyphs: vec![TestGlyph::square()],
            char_map: vec![],
            glyph_names: false,
            hinting: false,
            cff_outlines: false,
            extra_tables: vec![],
        }
    }

    /// Adds a glyph mapped from the specified chars.
    pub(crate) fn glyph(mut self, glyph: TestGlyph, chars: &[char]) -> Self {
        let glyph_idx = u16::try_from(self.glyphs.len()).unwrap();
        self.glyphs.push(glyph);
        self.char_map.extend(chars.iter().map(|&ch| (ch, glyph_idx)));
        self
    }

    /// Adds a version 2.0 `post` table with the `glyph{idx}` name for each glyph except `.notdef`.
    pub(crate) fn glyph_names(mut self) -> Self {
        self.glyph_names = true;
        self
    }

    /// Adds `cvt `, `fpgm`, `prep` and `gasp` tables.
    pub(crate) fn hinting(mut self) -> Self {
        self.hinting = true;
        self
    }

    /// Replaces `glyf` / `loca` tables with a (dummy) `CFF ` table.
    pub(crate) fn cff_outlines(mut self) -> Self {
        self.cff_outlines = true;
        self
    }

    pub(crate) fn extra_table(mut self, tag: &[u8; 4], data: Vec<u8>) -> Self {
        self.extra_tables.push((TableTag(*tag), data));
        self
    }

    fn glyph_count(&self) -> u16 {
        u16::try_from(self.glyphs.len()).unwrap()
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let sfnt_version = if self.cff_outlines {
            Font::CFF_SFNT_VERSION
        } else {
            Font::SFNT_VERSION
        };
        let mut writer = FontWriter::new(sfnt_version);

        let mut char_map = self.char_map.clone();
        char_map.sort_unstable();
        writer.write_table(TableTag::CMAP, |buffer| write_cmap(&char_map, buffer));

        let (glyf, loca, is_long_loca) = self.glyf_and_loca();
        writer.write_raw_table(TableTag::HEAD, &self.head(is_long_loca));
        writer.write_raw_table(TableTag::HHEA, &self.hhea());
        writer.write_raw_table(TableTag::HMTX, &self.hmtx());
        writer.write_raw_table(TableTag::MAXP, &self.maxp());
        writer.write_raw_table(TableTag::NAME, &Self::name());
        writer.write_raw_table(TableTag::OS2, &Self::os2());
        writer.write_raw_table(TableTag::POST, &self.post());
        if self.hinting {
            writer.write_raw_table(TableTag::CVT, &[0, 0, 0, 100, 0, 200]);
            writer.write_raw_table(TableTag::FPGM, &[0xb0, 0x00, 0x2c, 0x2d]); // FDEF 0, ENDF
            writer.write_raw_table(TableTag::PREP, &[0xb0, 0x01, 0x21]); // PUSHB 1, POP
            writer.write_raw_table(TableTag::GASP, &[0, 1, 0, 1, 0xff, 0xff, 0, 0x0f]);
        }
        for (tag, data) in &self.extra_tables {
            writer.write_raw_table(*tag, data);
        }

        if self.cff_outlines {
            writer.write_raw_table(TableTag::CFF, &[1, 0, 4, 1]);
        } else {
            writer.write_raw_table(TableTag::GLYF, &glyf);
            writer.write_raw_table(TableTag::LOCA, &loca);
        }
        writer.into_opentype()
    }

    fn glyf_and_loca(&self) -> (Vec<u8>, Vec<u8>, bool) {
        let mut glyf = vec![];
        let mut locations = vec![0];
        for glyph in &self.glyphs {
            glyph.write(&mut glyf);
            if glyf.len() % 2 == 1 {
                glyf.push(0);
            }
            locations.push(glyf.len());
        }

        let is_long = glyf.len() / 2 > usize::from(u16::MAX);
        let loca = if is_long {
            locations
                .into_iter()
                .flat_map(|loc| u32::try_from(loc).unwrap().to_be_bytes())
                .collect()
        } else {
            locations
                .into_iter()
                .flat_map(|loc| u16::try_from(loc / 2).unwrap().to_be_bytes())
                .collect()
        };
        (glyf, loca, is_long)
    }

    fn head(&self, is_long_loca: bool) -> Vec<u8> {
        let mut head = vec![];
        head.extend_from_slice(&0x_0001_0000_u32.to_be_bytes()); // version
        head.extend_from_slice(&0x_0001_0000_u32.to_be_bytes()); // fontRevision
        head.extend_from_slice(&0_u32.to_be_bytes()); // checksumAdjustment
        head.extend_from_slice(&0x_5f0f_3cf5_u32.to_be_bytes()); // magic
        head.extend_from_slice(&0x_000b_u16.to_be_bytes()); // flags
        head.extend_from_slice(&Self::UNITS_PER_EM.to_be_bytes());
        head.extend_from_slice(&[0; 16]); // created, modified
        for value in [0_i16, 0, 1_000, 100] {
            head.extend_from_slice(&value.to_be_bytes()); // bbox
        }
        head.extend_from_slice(&0_u16.to_be_bytes()); // macStyle
        head.extend_from_slice(&8_u16.to_be_bytes()); // lowestRecPPEM
        head.extend_from_slice(&2_i16.to_be_bytes()); // fontDirectionHint
        head.extend_from_slice(&u16::from(is_long_loca).to_be_bytes());
        head.extend_from_slice(&0_i16.to_be_bytes()); // glyphDataFormat
        assert_eq!(head.len(), 54);
        head
    }

    fn hhea(&self) -> Vec<u8> {
        let mut hhea = vec![];
        hhea.extend_from_slice(&0x_0001_0000_u32.to_be_bytes());
        // ascender, descender, lineGap, advanceWidthMax, minLSB, minRSB, xMaxExtent
        for value in [800_i16, -200, 0, 600, 0, 0, 1_000] {
            hhea.extend_from_slice(&value.to_be_bytes());
        }
        // caretSlopeRise, caretSlopeRun, caretOffset, reserved x4, metricDataFormat
        for value in [1_i16, 0, 0, 0, 0, 0, 0, 0] {
            hhea.extend_from_slice(&value.to_be_bytes());
        }
        hhea.extend_from_slice(&self.number_of_h_metrics().to_be_bytes());
        hhea
    }

    /// All glyphs except `.notdef` share the same advance, so there are 2 full metrics.
    fn number_of_h_metrics(&self) -> u16 {
        self.glyph_count().min(2)
    }

    fn hmtx(&self) -> Vec<u8> {
        let mut hmtx = vec![];
        for i in 0..self.glyph_count() {
            if i < self.number_of_h_metrics() {
                let advance = if i == 0 {
                    Self::NOTDEF_ADVANCE
                } else {
                    Self::ADVANCE
                };
                hmtx.extend_from_slice(&advance.to_be_bytes());
            }
            let lsb = i16::try_from(i % 10).unwrap();
            hmtx.extend_from_slice(&lsb.to_be_bytes());
        }
        hmtx
    }

    fn maxp(&self) -> Vec<u8> {
        let mut maxp = vec![];
        maxp.extend_from_slice(&0x_0001_0000_u32.to_be_bytes());
        maxp.extend_from_slice(&self.glyph_count().to_be_bytes());
        // maxPoints, maxContours, maxCompositePoints, maxCompositeContours
        for _ in 0..4 {
            maxp.extend_from_slice(&Self::MAXP_OUTLINE_VALUE.to_be_bytes());
        }
        // maxZones, maxTwilightPoints, maxStorage,
        // maxFunctionDefs, maxInstructionDefs, maxStackElements
        for value in [2_u16, 0, 0, 1, 0, 64] {
            maxp.extend_from_slice(&value.to_be_bytes());
        }
        // maxSizeOfInstructions, maxComponentElements, maxComponentDepth
        for _ in 0..3 {
            maxp.extend_from_slice(&Self::MAXP_OUTLINE_VALUE.to_be_bytes());
        }
        maxp
    }

    fn name() -> Vec<u8> {
        const RECORDS: [(u16, &str); 4] = [
            (1, "Test Sans"),
            (2, "Regular"),
            (4, "Test Sans Regular"),
            (6, "TestSans-Regular"),
        ];

        let mut name = vec![];
        name.extend_from_slice(&0_u16.to_be_bytes());
        name.extend_from_slice(&4_u16.to_be_bytes());
        name.extend_from_slice(&(6_u16 + 12 * 4).to_be_bytes());
        let mut storage = vec![];
        for (name_id, value) in RECORDS {
            let value: Vec<_> = value.encode_utf16().flat_map(u16::to_be_bytes).collect();
            let len = u16::try_from(value.len()).unwrap();
            let offset = u16::try_from(storage.len()).unwrap();
            for field in [3, 1, 0x0409, name_id, len, offset] {
                name.extend_from_slice(&field.to_be_bytes());
            }
            storage.extend_from_slice(&value);
        }
        name.extend_from_slice(&storage);
        name
    }

    fn os2() -> Vec<u8> {
        let mut os2 = vec![];
        // version, xAvgCharWidth, usWeightClass, usWidthClass, fsType
        for value in [4_u16, 600, 400, 5, 0] {
            os2.extend_from_slice(&value.to_be_bytes());
        }
        // Subscript / superscript / strikeout metrics
        for value in [650_i16, 600, 0, 75, 650, 600, 0, 350, 50, 250] {
            os2.extend_from_slice(&value.to_be_bytes());
        }
        os2.extend_from_slice(&0_i16.to_be_bytes()); // sFamilyClass
        os2.extend_from_slice(&[2, 0, 5, 3, 0, 0, 0, 0, 0, 0]); // PANOSE
        os2.extend_from_slice(&[0; 16]); // ulUnicodeRange1..4
        os2.extend_from_slice(b"NONE"); // achVendID
        os2.extend_from_slice(&0x_0040_u16.to_be_bytes()); // fsSelection: REGULAR
        os2.extend_from_slice(&0x_0020_u16.to_be_bytes()); // usFirstCharIndex
        os2.extend_from_slice(&0x_ffff_u16.to_be_bytes()); // usLastCharIndex
        // sTypoAscender, sTypoDescender, sTypoLineGap, usWinAscent, usWinDescent
        for value in [800_u16, 0x_ff38 /* -200 */, 0, 800, 200] {
            os2.extend_from_slice(&value.to_be_bytes());
        }
        os2.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0]); // ulCodePageRange1..2
        // sxHeight, sCapHeight, usDefaultChar, usBreakChar, usMaxContext
        for value in [500_u16, 700, 0, 0x20, 2] {
            os2.extend_from_slice(&value.to_be_bytes());
        }
        assert_eq!(os2.len(), 96);
        os2
    }

    fn post(&self) -> Vec<u8> {
        let version: u32 = if self.glyph_names {
            0x_0002_0000
        } else {
            0x_0003_0000
        };
        let mut post = version.to_be_bytes().to_vec();
        post.extend_from_slice(&0_u32.to_be_bytes()); // italicAngle
        post.extend_from_slice(&(-100_i16).to_be_bytes()); // underlinePosition
        post.extend_from_slice(&50_i16.to_be_bytes()); // underlineThickness
        post.extend_from_slice(&[0; 20]); // isFixedPitch, memory usage

        if self.glyph_names {
            post.extend_from_slice(&self.glyph_count().to_be_bytes());
            post.extend_from_slice(&0_u16.to_be_bytes()); // `.notdef`
            for i in 1..self.glyph_count() {
                post.extend_from_slice(&(257 + i).to_be_bytes());
            }
            for i in 1..self.glyph_count() {
                let name = format!("glyph{i}");
                post.push(u8::try_from(name.len()).unwrap());
                post.extend_from_slice(name.as_bytes());
            }
        }
        post
    }
}

/// Synthetic fonts used in parameterized tests.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TestFont {
    /// Latin letters, digits, accented letters and a ligature as composite glyphs.
    Latin,
    /// Latin font with hinting tables, glyph names and a layout table.
    Hinted,
    /// Font mapping chars outside the Basic Multilingual Plane.
    Symbols,
    /// Font with glyphs large enough to require the long `loca` format.
    Large,
}

impl TestFont {
    pub(crate) fn builder(self) -> TestFontBuilder {
        match self {
            Self::Latin => Self::latin_builder(),
            Self::Hinted => Self::latin_builder()
                .hinting()
                .glyph_names()
                .extra_table(b"GSUB", vec![0, 1, 0, 0, 0, 10, 0, 10, 0, 10, 0, 0]),
            Self::Symbols => {
                let mut builder = TestFontBuilder::new();
                for ch in 'a'..='e' {
                    builder = builder.glyph(TestGlyph::triangle(), &[ch]);
                }
                builder = builder.glyph(TestGlyph::square(), &['€']);
                for ch in '😀'..='😄' {
                    builder = builder.glyph(TestGlyph::triangle(), &[ch]);
                }
                // Composite of the `😀` and `a` glyphs
                builder.glyph(TestGlyph::Composite(vec![7, 1]), &['🙂'])
            }
            Self::Large => {
                let mut builder = TestFontBuilder::new().glyph(TestGlyph::Empty, &[' ']);
                for ch in 'a'..='h' {
                    let glyph = TestGlyph::zigzag(5_000);
                    builder = builder.glyph(glyph, &[ch, ch.to_ascii_uppercase()]);
                }
                builder
            }
        }
    }

    pub(crate) fn bytes(self) -> Vec<u8> {
        self.builder().build()
    }

    fn latin_builder() -> TestFontBuilder {
        let mut builder = TestFontBuilder::new().glyph(TestGlyph::Empty, &[' ', '\u{a0}']);
        let ranges = ['a'..='z', 'A'..='Z', '0'..='9'];
        for (i, ch) in ranges.into_iter().flatten().enumerate() {
            let glyph = if i % 2 == 0 {
                TestGlyph::triangle()
            } else {
                TestGlyph::square()
            };
            builder = builder.glyph(glyph, &[ch]);
        }
        builder = builder.glyph(TestGlyph::triangle(), &['!', '¡']);
        let acute = builder.glyph_count();
        builder = builder.glyph(TestGlyph::triangle(), &['\u{b4}']);

        // 'a' is at index 2, other lowercase letters follow
        let letter_idx = |ch: char| u16::try_from(u32::from(ch) - u32::from('a')).unwrap() + 2;
        builder
            .glyph(TestGlyph::Composite(vec![letter_idx('e'), acute]), &['é'])
            .glyph(TestGlyph::Composite(vec![letter_idx('a'), acute]), &['á'])
            .glyph(
                TestGlyph::Composite(vec![letter_idx('f'), letter_idx('i')]),
                &['\u{fb01}'],
            )
    }
}

pub(crate) const FONTS: [TestFont; 4] = [
    TestFont::Latin,
    TestFont::Hinted,
    TestFont::Symbols,
    TestFont::Large,
];

#[derive(Debug, Clone)]
pub(crate) enum TestCharSubset {
    Range(ops::RangeInclusive<char>),
    Str(&'static str),
}

impl TestCharSubset {
    pub(crate) fn to_set(&self) -> BTreeSet<char> {
        match self {
            Self::Range(range) => range.clone().collect(),
            Self::Str(s) => s.chars().collect(),
        }
    }
}

pub(crate) const SUBSET_CHARS: [TestCharSubset; 5] = [
    TestCharSubset::Range(' '..='~'),
    TestCharSubset::Range('a'..='z'),
    TestCharSubset::Str("Hello world!"),
    TestCharSubset::Str("café ﬁ 😀🙂€"),
    TestCharSubset::Str("A"),
];

#[derive(Debug)]
struct OpenTypeSanitizer {
    path: Option<String>,
}

impl Default for OpenTypeSanitizer {
    fn default() -> Self {
        let Ok(path) = env::var("OTS_SANITIZER") else {
            return Self { path: None };
        };
        let output = Command::new(&path)
            .arg("--version")
            .output()
            .unwrap_or_else(|err| {
                panic!("failed getting version for ots-sanitize at {path}: {err}");
            });
        assert!(
            output.status.success(),
            "failed getting version for ots-sanitize at {path}: non-zero exit code"
        );
        let version = String::from_utf8(output.stdout).unwrap_or_else(|err| {
            panic!("failed getting version for ots-sanitize at {path}: {err}");
        });
        println!("ots-sanitize version: {version}");
        Self { path: Some(path) }
    }
}

impl OpenTypeSanitizer {
    fn get() -> &'static Self {
        static SANITIZER: OnceLock<OpenTypeSanitizer> = OnceLock::new();
        SANITIZER.get_or_init(Self::default)
    }

    fn validate(&self, content: &[u8]) {
        let Some(path) = &self.path else {
            println!("OTS_SANITIZER env var is missing; skipping checks");
            return;
        };

        // Save content to the temporary file.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.as_file_mut().write_all(content).unwrap();
        file.as_file_mut().flush().unwrap();
        let file_path = file.into_temp_path();

        let output = Command::new(path)
            .arg(&file_path)
            .output()
            .expect("failed running ots-sanitize");
        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("ots-sanitize failed:\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}");
        }
    }
}

#[test_casing(4, FONTS)]
fn reading_font(font: TestFont) {
    let bytes = font.bytes();
    let font = Font::new(&bytes).unwrap();
    assert_eq!(font.units_per_em(), TestFontBuilder::UNITS_PER_EM);
    assert_eq!(font.ascender(), 800);
    assert_eq!(font.descender(), -200);
    assert_eq!(font.family_name().unwrap(), "Test Sans");
    assert_eq!(font.weight_class(), Some(400));

    let font_file = ReadScope::new(&bytes).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut reference_font = allsorts::Font::new(font_provider).unwrap();

    let test_str = "Hello, world! ¡Café! ﬁ 😀🙂 €ΩЖ";
    for ch in test_str.chars() {
        let id = font.map_char(ch);
        let (expected_idx, _) =
            reference_font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_eq!(id, expected_idx, "{ch:?}");
    }
}

#[test_casing(3, [TableTag::HHEA, TableTag::CMAP, TableTag::GLYF])]
fn font_without_required_table(tag: TableTag) {
    let mut bytes = TestFont::Latin.bytes();
    let table_count = usize::from(u16::from_be_bytes([bytes[4], bytes[5]]));
    let record_offset = (0..table_count)
        .map(|i| 12 + 16 * i)
        .find(|&offset| bytes[offset..offset + 4] == tag.0)
        .unwrap();
    bytes[record_offset..record_offset + 4].copy_from_slice(b"zzzz");

    let err = Font::new(&bytes).unwrap_err();
    assert!(matches!(err.kind(), ParseErrorKind::MissingTable), "{err}");
    assert_eq!(err.table(), Some(tag));
}

#[test_casing(20, Product((FONTS, SUBSET_CHARS)))]
fn subsetting_font(font: TestFont, chars: TestCharSubset) {
    let bytes = font.bytes();
    let chars = chars.to_set();
    let ttf = test_subsetting_font(&bytes, &chars);
    let resubset_ttf = test_subsetting_font(&ttf, &chars);
    assert_eq!(resubset_ttf, ttf);
}

fn test_subsetting_font(font_bytes: &[u8], chars: &BTreeSet<char>) -> Vec<u8> {
    let font = Font::new(font_bytes).unwrap();
    let subset = FontSubset::new(font, chars).unwrap();
    assert_eq!(subset.requested_char_count(), chars.len());
    assert_eq!(
        subset.resolved_char_count() + subset.missing_chars().len(),
        chars.len()
    );

    let ttf = subset.to_truetype();
    assert_valid_font(&ttf, true, &subset);
    #[cfg(feature = "woff2")]
    {
        let woff2 = subset.to_woff2().unwrap();
        assert_valid_font(&woff2, false, &subset);
    }
    ttf
}

pub(crate) fn assert_valid_font(raw: &[u8], is_ttf: bool, subset: &FontSubset<'_>) {
    if is_ttf {
        let font = Font::new(raw).unwrap();
        assert_eq!(font.glyph_count(), subset.glyph_count());
    }

    let font_file = ReadScope::new(raw).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut font = allsorts::Font::new(font_provider).unwrap();
    for &(ch, glyph_idx) in &subset.char_map {
        let (actual_idx, _) = font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_eq!(actual_idx, glyph_idx, "{ch:?}");
        assert_ne!(actual_idx, 0, "{ch:?}");
    }
    for &ch in subset.missing_chars() {
        let (actual_idx, _) = font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_eq!(actual_idx, 0, "{ch:?}");
    }

    OpenTypeSanitizer::get().validate(raw);
}
