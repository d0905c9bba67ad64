use crate::model::{DocTypeCode, DocumentIdentity, RawRow};
use crate::parsing::values::digits_only;
use regex::Regex;
use std::sync::LazyLock;

static IDENTITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CC|TI|CE|RC|NIT)\s+([\d.\-]{5,})\s+(.+)$").expect("identity pattern compiles")
});

/// Recognize a "document type + number + name" line, e.g.
/// `"CC 1.020.304.050 ANA MARIA RUIZ"`.
pub fn match_identity(line: &str) -> Option<DocumentIdentity> {
    let caps = IDENTITY_LINE.captures(line.trim())?;
    let type_code = DocTypeCode::from_str_loose(&caps[1])?;
    let number = digits_only(&caps[2]);
    let name = caps[3].trim().to_string();
    if number.is_empty() || name.is_empty() {
        return None;
    }
    Some(DocumentIdentity {
        type_code,
        number,
        name,
    })
}

/// The identity currently in force while walking one source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityState {
    pub current: Option<DocumentIdentity>,
}

/// What a row turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityStep {
    /// The row was an identity line; it replaces the current identity and is not data.
    Header,
    /// A data row, tagged with the identity in force (if any).
    Data(Option<DocumentIdentity>),
}

/// Advance the identity state over one row.
pub fn advance(state: IdentityState, row: &RawRow) -> (IdentityState, IdentityStep) {
    match match_identity(&row.joined_text()) {
        Some(identity) => (
            IdentityState {
                current: Some(identity),
            },
            IdentityStep::Header,
        ),
        None => {
            let tag = state.current.clone();
            (state, IdentityStep::Data(tag))
        }
    }
}

/// Run [`advance`] over a whole file's rows, keeping only data rows with
/// their identity tag.
pub fn tag_rows<I>(rows: I) -> Vec<(Option<DocumentIdentity>, RawRow)>
where
    I: IntoIterator<Item = RawRow>,
{
    rows.into_iter()
        .scan(IdentityState::default(), |state, row| {
            let (next, step) = advance(std::mem::take(state), &row);
            *state = next;
            Some(match step {
                IdentityStep::Header => None,
                IdentityStep::Data(identity) => Some((identity, row)),
            })
        })
        .flatten()
        .collect()
}
