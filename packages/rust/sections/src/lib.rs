//! Segmentation of generated recommendations into named sections.
//!
//! The model is asked to answer under four fixed, numbered headers (see
//! [`Section::header`]). This crate owns those literals: the prompt builder
//! renders them from here and [`parse_recommendation`] splits on them, so both
//! sides always agree.
//!
//! Parsing is a small line-driven state machine. Each trimmed line either opens
//! a section (literal, case-sensitive prefix match on its header), is appended
//! to the currently open section, or is dropped. Blank lines and anything
//! before the first recognised header are dropped. Headers may arrive in any
//! order; a section whose header never appears comes back empty.

use tracing::debug;

use migrationplanner_shared::RecommendationRecord;

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// The four parts of a batch recommendation, in canonical prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Patterns,
    Justification,
    Architecture,
    Cost,
}

impl Section {
    /// All sections in canonical order.
    pub const ALL: [Section; 4] = [
        Self::Patterns,
        Self::Justification,
        Self::Architecture,
        Self::Cost,
    ];

    /// Literal header line the model must start each section with.
    pub fn header(&self) -> &'static str {
        match self {
            Self::Patterns => "1. Top 3 Recommended Migration Patterns:",
            Self::Justification => "2. Justification:",
            Self::Architecture => "3. Potential AWS Architecture:",
            Self::Cost => "4. Cost Breakdown and Total Cost for each Migration Pattern:",
        }
    }

    /// The section whose header `line` starts with, if any.
    fn opened_by(line: &str) -> Option<Section> {
        Self::ALL.into_iter().find(|s| line.starts_with(s.header()))
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Which section, if any, is currently collecting lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Outside,
    In(Section),
}

/// The four trimmed sections extracted from one model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationSections {
    pub patterns: String,
    pub justification: String,
    pub architecture: String,
    pub cost: String,
}

impl RecommendationSections {
    /// Text collected for `section`.
    pub fn get(&self, section: Section) -> &str {
        match section {
            Section::Patterns => &self.patterns,
            Section::Justification => &self.justification,
            Section::Architecture => &self.architecture,
            Section::Cost => &self.cost,
        }
    }

    fn buffer_mut(&mut self, section: Section) -> &mut String {
        match section {
            Section::Patterns => &mut self.patterns,
            Section::Justification => &mut self.justification,
            Section::Architecture => &mut self.architecture,
            Section::Cost => &mut self.cost,
        }
    }

    /// True when no header was recognised at all.
    pub fn is_empty(&self) -> bool {
        Section::ALL.iter().all(|s| self.get(*s).is_empty())
    }

    /// Sections that came back empty, in canonical order.
    pub fn missing(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| self.get(*s).is_empty())
            .collect()
    }

    /// Re-render the non-empty sections in canonical order, one after another.
    pub fn to_text(&self) -> String {
        Section::ALL
            .iter()
            .map(|s| self.get(*s))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build the table row for `app_id`.
    pub fn into_record(self, app_id: impl Into<String>) -> RecommendationRecord {
        RecommendationRecord::new(
            app_id,
            &self.patterns,
            &self.justification,
            &self.architecture,
            &self.cost,
        )
    }
}

/// Split a raw model response into its four sections.
pub fn parse_recommendation(text: &str) -> RecommendationSections {
    let mut sections = RecommendationSections::default();
    let mut state = ParserState::Outside;

    for raw in text.lines() {
        let line = raw.trim();

        if let Some(section) = Section::opened_by(line) {
            state = ParserState::In(section);
            push_line(sections.buffer_mut(section), line);
            continue;
        }

        match state {
            ParserState::In(section) if !line.is_empty() => {
                push_line(sections.buffer_mut(section), line);
            }
            _ => {}
        }
    }

    for section in Section::ALL {
        let buffer = sections.buffer_mut(section);
        *buffer = buffer.trim().to_string();
    }

    debug!(missing = ?sections.missing(), "recommendation parsed");
    sections
}

fn push_line(buffer: &mut String, line: &str) {
    buffer.push_str(line);
    buffer.push('\n');
}
