//! Structured card payloads.
//!
//! A card maps a property name (`FN`, `TEL`, ...) to an ordered list of
//! field values, each optionally tied to a property group label
//! (`item1.TEL`). The text form is the vCard serialization used for GET
//! and PUT bodies; parameters beyond the group label are not modeled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dav::error::DavError;

/// One value of a card property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub value: String,
}

impl Field {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            group: None,
            value: value.into(),
        }
    }

    pub fn grouped(group: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            value: value.into(),
        }
    }
}

/// Structured card payload: property name → ordered field values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card(BTreeMap<String, Vec<Field>>);

impl Card {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        self.0.entry(name.into()).or_default().push(field);
    }

    pub fn get(&self, name: &str) -> Option<&[Field]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// First value of a property, the one clients display.
    pub fn preferred_value(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|fields| fields.first())
            .map(|f| f.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Field>)> {
        self.0.iter()
    }

    /// Serialize as a vCard text body. VERSION is emitted first; property
    /// order is otherwise deterministic.
    pub fn to_vcf(&self) -> String {
        let mut out = String::from("BEGIN:VCARD\r\n");
        let version = self.preferred_value("VERSION").unwrap_or("3.0");
        out.push_str("VERSION:");
        out.push_str(version);
        out.push_str("\r\n");
        for (name, fields) in &self.0 {
            if name == "VERSION" {
                continue;
            }
            for field in fields {
                if let Some(group) = &field.group {
                    out.push_str(group);
                    out.push('.');
                }
                out.push_str(name);
                out.push(':');
                out.push_str(&field.value);
                out.push_str("\r\n");
            }
        }
        out.push_str("END:VCARD\r\n");
        out
    }

    /// Parse a vCard text body. Folded lines are unfolded; property
    /// parameters after `;` are dropped, the group label is kept.
    pub fn from_vcf(text: &str) -> Result<Card, DavError> {
        let mut card = Card::new();
        let mut seen_begin = false;

        for line in unfold(text) {
            if line.is_empty() {
                continue;
            }
            let (name_part, value) = line
                .split_once(':')
                .ok_or_else(|| DavError::Decode(format!("vcard line without colon: {line:?}")))?;

            let (group, name_part) = match name_part.split_once('.') {
                Some((group, rest)) => (Some(group.to_string()), rest),
                None => (None, name_part),
            };
            // drop parameters such as TEL;TYPE=CELL
            let name = name_part.split(';').next().unwrap_or(name_part);
            let name = name.trim().to_ascii_uppercase();

            match name.as_str() {
                "BEGIN" => seen_begin = true,
                "END" => {}
                _ => {
                    if !seen_begin {
                        return Err(DavError::Decode("vcard without BEGIN".into()));
                    }
                    card.insert(
                        name,
                        Field {
                            group,
                            value: value.to_string(),
                        },
                    );
                }
            }
        }

        if !seen_begin {
            return Err(DavError::Decode("vcard without BEGIN".into()));
        }
        Ok(card)
    }
}

/// Join continuation lines (leading space or tab) onto their parent line.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(raw.to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card() -> Card {
        let mut card = Card::new();
        card.insert("FN", Field::new("Fest T"));
        card.insert("N", Field::new("T;Fest;;;"));
        card.insert("VERSION", Field::new("3.0"));
        card.insert("TEL", Field::grouped("item1", "+1 555 0100"));
        card
    }

    #[test]
    fn test_to_vcf_puts_version_first() {
        let vcf = sample_card().to_vcf();
        let lines: Vec<&str> = vcf.lines().collect();
        assert_eq!(lines[0], "BEGIN:VCARD");
        assert_eq!(lines[1], "VERSION:3.0");
        assert_eq!(*lines.last().unwrap(), "END:VCARD");
        assert!(vcf.contains("FN:Fest T\r\n"));
        assert!(vcf.contains("item1.TEL:+1 555 0100\r\n"));
    }

    #[test]
    fn test_from_vcf_round_trip() {
        let card = sample_card();
        let parsed = Card::from_vcf(&card.to_vcf()).unwrap();
        assert_eq!(parsed.preferred_value("FN"), Some("Fest T"));
        assert_eq!(parsed.get("TEL").unwrap()[0].group.as_deref(), Some("item1"));
    }

    #[test]
    fn test_from_vcf_unfolds_and_drops_parameters() {
        let text = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Fest\r\n  T\r\nTEL;TYPE=CELL:+1 555 0100\r\nEND:VCARD\r\n";
        let card = Card::from_vcf(text).unwrap();
        assert_eq!(card.preferred_value("FN"), Some("Fest T"));
        assert_eq!(card.preferred_value("TEL"), Some("+1 555 0100"));
    }

    #[test]
    fn test_from_vcf_rejects_garbage() {
        assert!(Card::from_vcf("FN:loose property").is_err());
        assert!(Card::from_vcf("BEGIN:VCARD\r\nno colon here\r\nEND:VCARD").is_err());
    }
}
