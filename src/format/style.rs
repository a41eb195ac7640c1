//! Citation styles and the layout rules that describe them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported citation styles, in menu order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    Plain,
    Apa,
    Mla,
    Chicago,
    Vancouver,
    Harvard,
    Ieee,
    Ama,
    Acs,
    Nature,
}

/// Error for style names that match no supported style
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StyleError {
    #[error("Unsupported citation style '{0}' (run `citeformat styles` for the list)")]
    Unsupported(String),
}

impl CitationStyle {
    /// All styles, in menu order (menu number = position + 1)
    pub const ALL: [CitationStyle; 10] = [
        CitationStyle::Plain,
        CitationStyle::Apa,
        CitationStyle::Mla,
        CitationStyle::Chicago,
        CitationStyle::Vancouver,
        CitationStyle::Harvard,
        CitationStyle::Ieee,
        CitationStyle::Ama,
        CitationStyle::Acs,
        CitationStyle::Nature,
    ];

    /// Short machine name
    pub fn key(&self) -> &'static str {
        match self {
            CitationStyle::Plain => "plain",
            CitationStyle::Apa => "apa",
            CitationStyle::Mla => "mla",
            CitationStyle::Chicago => "chicago",
            CitationStyle::Vancouver => "vancouver",
            CitationStyle::Harvard => "harvard",
            CitationStyle::Ieee => "ieee",
            CitationStyle::Ama => "ama",
            CitationStyle::Acs => "acs",
            CitationStyle::Nature => "nature",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            CitationStyle::Plain => "Plain summary",
            CitationStyle::Apa => "APA 7th",
            CitationStyle::Mla => "MLA 9th",
            CitationStyle::Chicago => "Chicago 17th (author-date)",
            CitationStyle::Vancouver => "Vancouver / ICMJE",
            CitationStyle::Harvard => "Harvard",
            CitationStyle::Ieee => "IEEE",
            CitationStyle::Ama => "AMA (American Medical Association)",
            CitationStyle::Acs => "ACS (American Chemical Society)",
            CitationStyle::Nature => "Nature",
        }
    }

    /// Position in the style menu, starting at 1
    pub fn menu_number(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or_default()
    }

    /// Alternative names accepted when parsing
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CitationStyle::Plain => &["plain-summary", "summary", "simple"],
            CitationStyle::Apa => &["apa7", "apa-7", "apa-7th"],
            CitationStyle::Mla => &["mla9", "mla-9", "mla-9th"],
            CitationStyle::Chicago => &["chicago-author-date", "chicago17", "chicago-17th"],
            CitationStyle::Vancouver => &["icmje", "vancouver-icmje", "nlm"],
            CitationStyle::Harvard => &["harvard-cite-them-right"],
            CitationStyle::Ieee => &[],
            CitationStyle::Ama => &["american-medical-association"],
            CitationStyle::Acs => &["american-chemical-society"],
            CitationStyle::Nature => &[],
        }
    }

    /// Layout rules for this style
    pub fn rules(&self) -> &'static StyleRules {
        match self {
            CitationStyle::Plain => &PLAIN,
            CitationStyle::Apa => &APA,
            CitationStyle::Mla => &MLA,
            CitationStyle::Chicago => &CHICAGO,
            CitationStyle::Vancouver => &VANCOUVER,
            CitationStyle::Harvard => &HARVARD,
            CitationStyle::Ieee => &IEEE,
            CitationStyle::Ama => &AMA,
            CitationStyle::Acs => &ACS,
            CitationStyle::Nature => &NATURE,
        }
    }
}

impl Default for CitationStyle {
    fn default() -> Self {
        CitationStyle::Apa
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for CitationStyle {
    type Err = StyleError;

    /// Parse a style from its key, an alias or its menu number, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .trim()
            .to_lowercase()
            .replace(&['_', ' '][..], "-");

        if let Ok(number) = name.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|i| Self::ALL.get(i).copied())
                .ok_or_else(|| StyleError::Unsupported(s.trim().to_string()));
        }

        Self::ALL
            .iter()
            .copied()
            .find(|style| style.key() == name || style.aliases().contains(&name.as_str()))
            .ok_or_else(|| StyleError::Unsupported(s.trim().to_string()))
    }
}

/// How a citation's list position is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numbering {
    /// `1. `
    Dot,
    /// `[1] `
    Bracket,
}

impl Numbering {
    pub fn prefix(&self, number: usize) -> String {
        match self {
            Numbering::Dot => format!("{}. ", number),
            Numbering::Bracket => format!("[{}] ", number),
        }
    }
}

/// How a single author name is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameForm {
    /// `Hinton`
    FamilyOnly,
    /// `Hinton, G. E.`
    FamilyInitials,
    /// `Hinton, Geoffrey E.`
    FamilyGiven,
    /// `Geoffrey E. Hinton`
    GivenFamily,
    /// `G. E. Hinton`
    InitialsFamily,
    /// `Hinton GE`
    FamilyCompact,
}

/// Author-list truncation: lists longer than `max` keep `keep` names, then
/// the marker, then optionally the final author
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    pub max: usize,
    pub keep: usize,
    pub marker: &'static str,
    pub keep_last: bool,
}

/// How the author list is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRules {
    /// Form of the first listed author
    pub first: NameForm,
    /// Form of every later author
    pub rest: NameForm,
    /// Between names in a list of three or more
    pub delimiter: &'static str,
    /// Between the two names of a two-author list
    pub pair: &'static str,
    /// Before the final name in a list of three or more
    pub last: &'static str,
    pub truncation: Option<Truncation>,
}

/// Record fields a style can place after the author list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Journal,
    Year,
    Volume,
    Issue,
    Pages,
    /// DOI as a resolver URL
    DoiUrl,
    /// DOI in bare form
    Doi,
}

/// Text emphasis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    Italic,
    Bold,
}

/// One field with its surrounding punctuation.
///
/// Optional fields that are missing drop their affixes too; `Title` and
/// `Year` always render, using placeholders when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub field: Field,
    pub before: &'static str,
    pub after: &'static str,
    pub emphasis: Option<Emphasis>,
}

const fn piece(field: Field, before: &'static str) -> Piece {
    Piece {
        field,
        before,
        after: "",
        emphasis: None,
    }
}

const fn wrapped(field: Field, before: &'static str, after: &'static str) -> Piece {
    Piece {
        field,
        before,
        after,
        emphasis: None,
    }
}

const fn styled(field: Field, before: &'static str, emphasis: Emphasis) -> Piece {
    Piece {
        field,
        before,
        after: "",
        emphasis: Some(emphasis),
    }
}

/// Full layout of a citation style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRules {
    pub numbering: Numbering,
    pub names: NameRules,
    pub pieces: &'static [Piece],
    /// Closing punctuation when the citation ends with a DOI
    pub close_after_doi: &'static str,
    /// Closing punctuation otherwise
    pub close: &'static str,
}

const PLAIN: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyOnly,
        rest: NameForm::FamilyOnly,
        delimiter: ", ",
        pair: " and ",
        last: " and ",
        truncation: Some(Truncation {
            max: 2,
            keep: 1,
            marker: " et al.",
            keep_last: false,
        }),
    },
    pieces: &[
        piece(Field::Journal, ". "),
        piece(Field::Year, ". "),
        piece(Field::DoiUrl, ". "),
    ],
    close_after_doi: ".",
    close: ".",
};

const APA: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyInitials,
        rest: NameForm::FamilyInitials,
        delimiter: ", ",
        pair: ", & ",
        last: ", & ",
        truncation: Some(Truncation {
            max: 20,
            keep: 19,
            marker: ", ... ",
            keep_last: true,
        }),
    },
    pieces: &[
        wrapped(Field::Year, " (", ")"),
        piece(Field::Title, ". "),
        styled(Field::Journal, ". ", Emphasis::Italic),
        styled(Field::Volume, ", ", Emphasis::Italic),
        wrapped(Field::Issue, "(", ")"),
        piece(Field::Pages, ", "),
        piece(Field::DoiUrl, ". "),
    ],
    close_after_doi: "",
    close: ".",
};

const MLA: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyGiven,
        rest: NameForm::GivenFamily,
        delimiter: ", ",
        pair: ", and ",
        last: ", and ",
        truncation: Some(Truncation {
            max: 2,
            keep: 1,
            marker: ", et al.",
            keep_last: false,
        }),
    },
    pieces: &[
        wrapped(Field::Title, ". \"", ".\""),
        styled(Field::Journal, " ", Emphasis::Italic),
        piece(Field::Volume, ", vol. "),
        piece(Field::Issue, ", no. "),
        piece(Field::Year, ", "),
        piece(Field::Pages, ", pp. "),
        piece(Field::DoiUrl, ", "),
    ],
    close_after_doi: ".",
    close: ".",
};

const CHICAGO: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyInitials,
        rest: NameForm::FamilyInitials,
        delimiter: ", ",
        pair: ", and ",
        last: ", and ",
        truncation: Some(Truncation {
            max: 3,
            keep: 1,
            marker: ", et al.",
            keep_last: false,
        }),
    },
    pieces: &[
        piece(Field::Year, ". "),
        wrapped(Field::Title, ". \"", ".\""),
        styled(Field::Journal, " ", Emphasis::Italic),
        piece(Field::Volume, " "),
        wrapped(Field::Issue, " (", ")"),
        piece(Field::Pages, ": "),
        piece(Field::DoiUrl, ". "),
    ],
    close_after_doi: ".",
    close: ".",
};

const VANCOUVER: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyCompact,
        rest: NameForm::FamilyCompact,
        delimiter: ", ",
        pair: ", ",
        last: ", ",
        truncation: Some(Truncation {
            max: 6,
            keep: 6,
            marker: ", et al.",
            keep_last: false,
        }),
    },
    pieces: &[
        piece(Field::Title, ". "),
        piece(Field::Journal, ". "),
        piece(Field::Year, ". "),
        piece(Field::Volume, ";"),
        wrapped(Field::Issue, "(", ")"),
        piece(Field::Pages, ":"),
        piece(Field::DoiUrl, ". "),
    ],
    close_after_doi: ".",
    close: ".",
};

const HARVARD: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyInitials,
        rest: NameForm::FamilyInitials,
        delimiter: ", ",
        pair: " and ",
        last: " and ",
        truncation: Some(Truncation {
            max: 3,
            keep: 1,
            marker: " et al.",
            keep_last: false,
        }),
    },
    pieces: &[
        wrapped(Field::Year, " (", ")"),
        wrapped(Field::Title, " '", "'"),
        styled(Field::Journal, ", ", Emphasis::Italic),
        piece(Field::Volume, ", "),
        wrapped(Field::Issue, "(", ")"),
        piece(Field::Pages, ", pp. "),
        piece(Field::DoiUrl, ". doi: "),
    ],
    close_after_doi: ".",
    close: ".",
};

const IEEE: StyleRules = StyleRules {
    numbering: Numbering::Bracket,
    names: NameRules {
        first: NameForm::InitialsFamily,
        rest: NameForm::InitialsFamily,
        delimiter: ", ",
        pair: " and ",
        last: ", and ",
        truncation: Some(Truncation {
            max: 6,
            keep: 1,
            marker: " et al.",
            keep_last: false,
        }),
    },
    pieces: &[
        wrapped(Field::Title, ", \"", ",\""),
        styled(Field::Journal, " ", Emphasis::Italic),
        piece(Field::Volume, ", vol. "),
        piece(Field::Issue, ", no. "),
        piece(Field::Pages, ", pp. "),
        piece(Field::Year, ", "),
        piece(Field::DoiUrl, ", doi: "),
    ],
    close_after_doi: ".",
    close: ".",
};

const AMA: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyCompact,
        rest: NameForm::FamilyCompact,
        delimiter: ", ",
        pair: ", ",
        last: ", ",
        truncation: Some(Truncation {
            max: 6,
            keep: 3,
            marker: ", et al.",
            keep_last: false,
        }),
    },
    pieces: &[
        piece(Field::Title, ". "),
        styled(Field::Journal, ". ", Emphasis::Italic),
        piece(Field::Year, ". "),
        piece(Field::Volume, ";"),
        wrapped(Field::Issue, "(", ")"),
        piece(Field::Pages, ":"),
        piece(Field::Doi, ". doi:"),
    ],
    close_after_doi: "",
    close: ".",
};

const ACS: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyInitials,
        rest: NameForm::FamilyInitials,
        delimiter: "; ",
        pair: "; ",
        last: "; ",
        truncation: None,
    },
    pieces: &[
        piece(Field::Title, ". "),
        styled(Field::Journal, ". ", Emphasis::Italic),
        styled(Field::Year, " ", Emphasis::Bold),
        styled(Field::Volume, ", ", Emphasis::Italic),
        wrapped(Field::Issue, " (", ")"),
        piece(Field::Pages, ", "),
        piece(Field::DoiUrl, ". "),
    ],
    close_after_doi: ".",
    close: ".",
};

const NATURE: StyleRules = StyleRules {
    numbering: Numbering::Dot,
    names: NameRules {
        first: NameForm::FamilyInitials,
        rest: NameForm::FamilyInitials,
        delimiter: ", ",
        pair: " & ",
        last: " & ",
        truncation: Some(Truncation {
            max: 5,
            keep: 1,
            marker: " et al.",
            keep_last: false,
        }),
    },
    pieces: &[
        piece(Field::Title, ". "),
        styled(Field::Journal, ". ", Emphasis::Italic),
        styled(Field::Volume, " ", Emphasis::Bold),
        piece(Field::Pages, ", "),
        wrapped(Field::Year, " (", ")"),
        piece(Field::DoiUrl, ". "),
    ],
    close_after_doi: "",
    close: ".",
};
