//! PDF output built with lopdf.
//!
//! Text is set in the standard Type 1 fonts with WinAnsi encoding, so no
//! font files are embedded. Line breaking uses the Times-Roman metrics,
//! scaled for bold and italic faces.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::{ExportError, ExportOptions, DOCUMENT_TITLE};
use crate::format::{Emphasis, FormattedCitation, SegmentKind};

/// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 72.0;

const HEADING_SIZE: f32 = 16.0;
const META_SIZE: f32 = 9.0;
const ENTRY_SIZE: f32 = 11.0;
const LEADING: f32 = 16.0;
const ENTRY_GAP: f32 = 8.0;
const HANGING_INDENT: f32 = 18.0;

const LINK_COLOR: [f32; 3] = [0.102, 0.322, 0.463];
const META_COLOR: [f32; 3] = [0.4, 0.4, 0.4];
const TEXT_COLOR: [f32; 3] = [0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Roman,
    Italic,
    Bold,
    BoldItalic,
    Heading,
    Meta,
}

impl Font {
    const ALL: [Font; 6] = [
        Font::Roman,
        Font::Italic,
        Font::Bold,
        Font::BoldItalic,
        Font::Heading,
        Font::Meta,
    ];

    fn resource(self) -> &'static str {
        match self {
            Font::Roman => "F1",
            Font::Italic => "F2",
            Font::Bold => "F3",
            Font::BoldItalic => "F4",
            Font::Heading => "F5",
            Font::Meta => "F6",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Roman => "Times-Roman",
            Font::Italic => "Times-Italic",
            Font::Bold => "Times-Bold",
            Font::BoldItalic => "Times-BoldItalic",
            Font::Heading => "Helvetica-Bold",
            Font::Meta => "Helvetica-Oblique",
        }
    }

    fn for_segment(emphasis: Option<Emphasis>, highlighted: bool) -> Font {
        match (emphasis, highlighted) {
            (Some(Emphasis::Italic), true) => Font::BoldItalic,
            (Some(Emphasis::Italic), false) => Font::Italic,
            (Some(Emphasis::Bold), _) | (None, true) => Font::Bold,
            (None, false) => Font::Roman,
        }
    }

    /// Width relative to Times-Roman
    fn scale(self) -> f32 {
        match self {
            Font::Roman | Font::Italic => 1.0,
            Font::Bold | Font::BoldItalic => 1.06,
            Font::Heading | Font::Meta => 1.12,
        }
    }
}

/// Times-Roman advance widths for printable ASCII, in 1/1000 em
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // ' '..'/'
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, // '0'..'?'
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, // '@'..'O'
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, // 'P'..'_'
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, // '`'..'o'
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, // 'p'..'~'
];

fn char_width(c: char) -> f32 {
    let code = c as u32;
    let units = if (0x20..0x7f).contains(&code) {
        TIMES_ROMAN_WIDTHS[(code - 0x20) as usize]
    } else if c.is_uppercase() {
        722
    } else {
        500
    };
    f32::from(units) / 1000.0
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().map(char_width).sum::<f32>() * size * font.scale()
}

/// WinAnsi (code page 1252) byte for `c`
fn winansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    if (0x20..0x7f).contains(&code) || (0xa0..=0xff).contains(&code) {
        return u8::try_from(code).ok();
    }
    let byte = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(byte)
}

/// Replace characters outside WinAnsi with ASCII spellings, dropping the
/// ones that have none
fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if winansi_byte(c).is_some() {
            out.push(c);
            continue;
        }
        match c {
            '\t' | '\n' | '\r' => out.push(' '),
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2212}' | '─' | '━' => out.push('-'),
            '→' => out.push_str("->"),
            '←' => out.push_str("<-"),
            '≤' => out.push_str("<="),
            '≥' => out.push_str(">="),
            'α' => out.push_str("alpha"),
            'β' => out.push_str("beta"),
            'γ' => out.push_str("gamma"),
            'δ' => out.push_str("delta"),
            'κ' => out.push_str("kappa"),
            'λ' => out.push_str("lambda"),
            'μ' => out.push_str("mu"),
            'σ' => out.push_str("sigma"),
            _ => {}
        }
    }
    out
}

fn real(value: f32) -> Object {
    value.into()
}

fn encode(text: &str) -> Vec<u8> {
    text.chars().filter_map(winansi_byte).collect()
}

/// A run of text in one font
#[derive(Debug, Clone)]
struct Run {
    font: Font,
    text: String,
    link: Option<String>,
}

/// Runs between two whitespace breaks
#[derive(Debug, Clone, Default)]
struct Word {
    runs: Vec<Run>,
}

impl Word {
    fn width(&self) -> f32 {
        self.runs
            .iter()
            .map(|r| text_width(&r.text, r.font, ENTRY_SIZE))
            .sum()
    }

    fn push(&mut self, c: char, font: Font, link: Option<&str>) {
        match self.runs.last_mut() {
            Some(run) if run.font == font && run.link.as_deref() == link => run.text.push(c),
            _ => self.runs.push(Run {
                font,
                text: c.to_string(),
                link: link.map(str::to_string),
            }),
        }
    }
}

/// Split a citation into words, keeping font changes inside a word
fn citation_words(citation: &FormattedCitation) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = Word::default();

    for segment in &citation.segments {
        let font = Font::for_segment(segment.emphasis, segment.highlighted);
        let link = match &segment.kind {
            SegmentKind::Link { url } => Some(url.as_str()),
            _ => None,
        };
        for c in transliterate(&segment.text).chars() {
            if c == ' ' {
                if !current.runs.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            } else {
                current.push(c, font, link);
            }
        }
    }
    if !current.runs.is_empty() {
        words.push(current);
    }
    words
}

/// Greedy line breaking with a hanging indent after the first line
fn wrap(words: Vec<Word>, width: f32) -> Vec<Vec<Word>> {
    let space = text_width(" ", Font::Roman, ENTRY_SIZE);
    let mut lines: Vec<Vec<Word>> = Vec::new();
    let mut line: Vec<Word> = Vec::new();
    let mut used = 0.0;

    for word in words {
        let available = if lines.is_empty() {
            width
        } else {
            width - HANGING_INDENT
        };
        let word_width = word.width();
        if !line.is_empty() && used + space + word_width > available {
            lines.push(std::mem::take(&mut line));
            used = 0.0;
        }
        used += if line.is_empty() {
            word_width
        } else {
            space + word_width
        };
        line.push(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Content and link annotations of one page
#[derive(Debug, Default)]
struct Page {
    operations: Vec<Operation>,
    links: Vec<(String, [f32; 4])>,
}

impl Page {
    fn color(&mut self, rgb: [f32; 3]) {
        self.operations.push(Operation::new(
            "rg",
            rgb.iter().map(|v| real(*v)).collect(),
        ));
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str, rgb: [f32; 3]) {
        self.color(rgb);
        self.operations.push(Operation::new("BT", vec![]));
        self.operations.push(Operation::new(
            "Tf",
            vec![font.resource().into(), real(size)],
        ));
        self.operations
            .push(Operation::new("Td", vec![real(x), real(y)]));
        self.operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode(text))],
        ));
        self.operations.push(Operation::new("ET", vec![]));
    }

    fn rule(&mut self, y: f32) {
        self.operations.extend([
            Operation::new("w", vec![real(0.5)]),
            Operation::new(
                "RG",
                vec![real(0.67), real(0.67), real(0.67)],
            ),
            Operation::new("m", vec![real(MARGIN), real(y)]),
            Operation::new("l", vec![real(PAGE_WIDTH - MARGIN), real(y)]),
            Operation::new("S", vec![]),
        ]);
    }

    fn line(&mut self, words: &[Word], x: f32, y: f32) {
        let space = text_width(" ", Font::Roman, ENTRY_SIZE);
        let mut cursor = x;
        let mut color = None;

        self.operations.push(Operation::new("BT", vec![]));
        self.operations
            .push(Operation::new("Td", vec![real(x), real(y)]));
        for (i, word) in words.iter().enumerate() {
            for (j, run) in word.runs.iter().enumerate() {
                let mut text = run.text.clone();
                if i > 0 && j == 0 {
                    text.insert(0, ' ');
                    cursor += space;
                }
                let rgb = if run.link.is_some() {
                    LINK_COLOR
                } else {
                    TEXT_COLOR
                };
                if color != Some(rgb) {
                    self.color(rgb);
                    color = Some(rgb);
                }
                self.operations.push(Operation::new(
                    "Tf",
                    vec![run.font.resource().into(), real(ENTRY_SIZE)],
                ));
                self.operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(encode(&text))],
                ));

                let width = text_width(&run.text, run.font, ENTRY_SIZE);
                if let Some(url) = &run.link {
                    self.links.push((
                        url.clone(),
                        [cursor, y - 2.0, cursor + width, y + ENTRY_SIZE],
                    ));
                }
                cursor += width;
            }
        }
        self.operations.push(Operation::new("ET", vec![]));
    }
}

/// Lay citations out over as many pages as needed
fn layout(citations: &[FormattedCitation], options: &ExportOptions) -> Vec<Page> {
    let text_width = PAGE_WIDTH - 2.0 * MARGIN;
    let mut pages = Vec::new();
    let mut page = Page::default();
    let mut y = PAGE_HEIGHT - MARGIN - HEADING_SIZE;

    page.text(Font::Heading, HEADING_SIZE, MARGIN, y, DOCUMENT_TITLE, TEXT_COLOR);
    y -= HEADING_SIZE;
    page.text(
        Font::Meta,
        META_SIZE,
        MARGIN,
        y,
        &transliterate(&options.meta_line()),
        META_COLOR,
    );
    y -= 8.0;
    page.rule(y);
    y -= 14.0 + ENTRY_SIZE;

    for citation in citations {
        for (i, words) in wrap(citation_words(citation), text_width)
            .into_iter()
            .enumerate()
        {
            if y < MARGIN {
                pages.push(std::mem::take(&mut page));
                y = PAGE_HEIGHT - MARGIN - ENTRY_SIZE;
            }
            let indent = if i == 0 { 0.0 } else { HANGING_INDENT };
            page.line(&words, MARGIN + indent, y);
            y -= LEADING;
        }
        y -= ENTRY_GAP;
    }
    pages.push(page);
    pages
}

fn pdf_error(err: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(err.to_string())
}

fn link_annotation(doc: &mut Document, url: &str, rect: [f32; 4]) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect.iter().map(|v| real(*v)).collect::<Vec<_>>(),
        "Border" => vec![0.into(), 0.into(), 0.into()],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(url),
        },
    })
}

/// Render `citations` to PDF bytes
pub(super) fn pdf_document(
    citations: &[FormattedCitation],
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource(), id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut kids = Vec::new();
    for page in layout(citations, options) {
        let content = Content {
            operations: page.operations,
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(pdf_error)?,
        ));
        let annots: Vec<Object> = page
            .links
            .iter()
            .map(|(url, rect)| link_annotation(&mut doc, url, *rect).into())
            .collect();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Annots" => annots,
        });
        kids.push(Object::from(page_id));
    }

    let count = i64::try_from(kids.len()).map_err(pdf_error)?;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(DOCUMENT_TITLE),
        "Subject" => Object::string_literal(encode(&transliterate(&options.meta_line()))),
        "Producer" => Object::string_literal(concat!("citeformat ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_error)?;
    Ok(bytes)
}
