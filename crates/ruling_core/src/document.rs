use std::fmt;

/// The six sections of a reformatted ruling, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Case number, ruling date and subject as `【label】 value` lines.
    Header,
    /// Parties and their representatives.
    Parties,
    /// The paragraph introducing the case, ending with the court's ruling formula.
    Synopsis,
    /// 主文
    Holding,
    /// 理由
    Reasoning,
    /// Court division, judges and clerk.
    Signatures,
}

impl SectionKind {
    pub const ORDER: [SectionKind; 6] = [
        SectionKind::Header,
        SectionKind::Parties,
        SectionKind::Synopsis,
        SectionKind::Holding,
        SectionKind::Reasoning,
        SectionKind::Signatures,
    ];
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionKind::Header => "header",
            SectionKind::Parties => "parties",
            SectionKind::Synopsis => "synopsis",
            SectionKind::Holding => "holding",
            SectionKind::Reasoning => "reasoning",
            SectionKind::Signatures => "signatures",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub lines: Vec<String>,
}

impl Section {
    pub fn new(kind: SectionKind, lines: Vec<String>) -> Self {
        Self { kind, lines }
    }

    /// True when every line is blank.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }
}

/// A reformatted ruling: sections always appear in [`SectionKind::ORDER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredDocument {
    sections: Vec<Section>,
}

impl StructuredDocument {
    pub(crate) fn from_sections(sections: Vec<Section>) -> Self {
        debug_assert!(sections
            .iter()
            .map(|s| s.kind)
            .eq(SectionKind::ORDER.iter().copied()));
        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Every line of every section, with one blank line between sections.
    pub fn lines(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for (index, section) in self.sections.iter().enumerate() {
            if index > 0 {
                out.push("");
            }
            out.extend(section.lines.iter().map(String::as_str));
        }
        out
    }

    pub fn to_text(&self) -> String {
        let mut text = self.lines().join("\n");
        text.push('\n');
        text
    }
}
