//! `word/styles.xml` parsing and `basedOn` inheritance.

use super::xml::{attr_val, heading_from_outline, is_revision_record, on_off, underline_on};
use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct StyleDefinition {
    name: Option<String>,
    based_on: Option<String>,
    bold: Option<bool>,
    underline: Option<bool>,
    /// 0-based outline level from pPr/outlineLvl
    outline_level: Option<u32>,
}

/// Style definitions keyed by style id
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    styles: HashMap<String, StyleDefinition>,
}

impl StyleSheet {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut styles = HashMap::new();
        let mut current: Option<(String, StyleDefinition)> = None;
        let mut in_rpr = false;
        let mut in_ppr = false;
        let mut skip_depth = 0usize;

        loop {
            let event = reader.read_event()?;

            if skip_depth > 0 {
                match event {
                    Event::Start(_) => skip_depth += 1,
                    Event::End(_) => skip_depth -= 1,
                    Event::Eof => break,
                    _ => {}
                }
                continue;
            }

            let empty = matches!(event, Event::Empty(_));
            match event {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    local if !empty && is_revision_record(local) => skip_depth = 1,
                    b"style" => {
                        if let Some(id) = attr_val(&e, b"styleId") {
                            current = Some((id, StyleDefinition::default()));
                        }
                    }
                    b"rPr" => in_rpr = !empty,
                    b"pPr" => in_ppr = !empty,
                    b"name" => {
                        if let Some((_, def)) = current.as_mut() {
                            def.name = attr_val(&e, b"val");
                        }
                    }
                    b"basedOn" => {
                        if let Some((_, def)) = current.as_mut() {
                            def.based_on = attr_val(&e, b"val");
                        }
                    }
                    b"b" if in_rpr => {
                        if let Some((_, def)) = current.as_mut() {
                            def.bold = Some(on_off(attr_val(&e, b"val").as_deref()));
                        }
                    }
                    b"u" if in_rpr => {
                        if let Some((_, def)) = current.as_mut() {
                            def.underline = Some(underline_on(attr_val(&e, b"val").as_deref()));
                        }
                    }
                    b"outlineLvl" if in_ppr => {
                        if let Some((_, def)) = current.as_mut() {
                            def.outline_level =
                                attr_val(&e, b"val").and_then(|v| v.parse::<u32>().ok());
                        }
                    }
                    _ => {}
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"style" => {
                        if let Some((id, def)) = current.take() {
                            styles.insert(id, def);
                        }
                    }
                    b"rPr" => in_rpr = false,
                    b"pPr" => in_ppr = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { styles })
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Walk the `basedOn` chain and return the first defined value.
    /// Circular chains stop at the first repeated id.
    fn resolve<T>(&self, style_id: &str, pick: impl Fn(&StyleDefinition) -> Option<T>) -> Option<T> {
        let mut visited: Vec<&str> = Vec::new();
        let mut current = style_id;

        while let Some(def) = self.styles.get(current) {
            if visited.contains(&current) {
                break;
            }
            visited.push(current);

            if let Some(value) = pick(def) {
                return Some(value);
            }
            match def.based_on.as_deref() {
                Some(base) => current = base,
                None => break,
            }
        }
        None
    }

    pub fn bold(&self, style_id: &str) -> Option<bool> {
        self.resolve(style_id, |d| d.bold)
    }

    pub fn underline(&self, style_id: &str) -> Option<bool> {
        self.resolve(style_id, |d| d.underline)
    }

    /// Heading level of a paragraph style: "heading 2" -> 2, "Title" -> 0,
    /// otherwise outlineLvl + 1. Outline level 9 (body text) is no heading.
    pub fn heading_level(&self, style_id: &str) -> Option<u32> {
        let name = self
            .styles
            .get(style_id)
            .and_then(|d| d.name.clone())
            .unwrap_or_else(|| style_id.to_string());

        heading_level_from_name(&name)
            .or_else(|| self.resolve(style_id, |d| d.outline_level).and_then(heading_from_outline))
    }
}

/// "Heading 3", "heading3", "Heading3Char" -> 3; "Title" -> 0
pub fn heading_level_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    if lower == "title" {
        return Some(0);
    }
    let rest = lower.strip_prefix("heading")?.trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
