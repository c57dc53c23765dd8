//! Rule-based restructuring of raw ruling text into a [`StructuredDocument`].
//!
//! The text is normalized once, then six windows are cut from it in a fixed
//! order, each ending at a landmark marker. A missing landmark or a window
//! that yields nothing rejects the whole document.
mod cursor;
pub mod rules;
mod windows;

use std::fmt;

use crate::document::{Section, SectionKind, StructuredDocument};
use cursor::ScanCursor;

/// Text markers that delimit the reformatting windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landmark {
    /// A party line opening with a petitioner/appellant role.
    Petitioner,
    /// The `上列` sentence that follows the party list.
    Foregoing,
    /// The `本院...：` line closing the synopsis.
    CourtRuling,
    /// The `主文` heading.
    Holding,
    /// The `理由` heading.
    Reasoning,
    /// `裁定如主文。` closing the reasoning.
    RulingPhrase,
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self {
            Landmark::Petitioner => "petitioner role",
            Landmark::Foregoing => windows::FOREGOING_MARKER,
            Landmark::CourtRuling => "本院...：",
            Landmark::Holding => windows::HOLDING_MARKER,
            Landmark::Reasoning => windows::REASONING_MARKER,
            Landmark::RulingPhrase => windows::RULING_PHRASES[0],
        };
        f.write_str(marker)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReformatError {
    #[error("ruling text is empty")]
    EmptyInput,
    #[error("landmark `{0}` not found")]
    MissingMarker(Landmark),
    #[error("{0} section is empty")]
    EmptySection(SectionKind),
}

pub trait Reformatter: Send + Sync {
    fn reformat(&self, raw: &str) -> Result<StructuredDocument, ReformatError>;
}

/// Reformatter for the portal's civil-ruling template.
#[derive(Debug, Default, Clone, Copy)]
pub struct RulingReformatter;

impl Reformatter for RulingReformatter {
    fn reformat(&self, raw: &str) -> Result<StructuredDocument, ReformatError> {
        reformat(raw)
    }
}

pub fn reformat(raw: &str) -> Result<StructuredDocument, ReformatError> {
    let text = rules::normalize(raw);
    if text.is_empty() {
        return Err(ReformatError::EmptyInput);
    }

    let mut cursor = ScanCursor::new(&text);
    let mut sections = Vec::with_capacity(SectionKind::ORDER.len());
    for kind in SectionKind::ORDER {
        cursor.skip_blank();
        let section = cut_window(kind, &mut cursor)?;
        if section.is_blank() {
            return Err(ReformatError::EmptySection(kind));
        }
        sections.push(section);
    }
    Ok(StructuredDocument::from_sections(sections))
}

fn cut_window(kind: SectionKind, cursor: &mut ScanCursor) -> Result<Section, ReformatError> {
    match kind {
        SectionKind::Header => windows::header(cursor),
        SectionKind::Parties => windows::parties(cursor),
        SectionKind::Synopsis => windows::synopsis(cursor),
        SectionKind::Holding => windows::holding(cursor),
        SectionKind::Reasoning => windows::reasoning(cursor),
        SectionKind::Signatures => windows::signatures(cursor),
    }
}
