//! Scenario metadata document (`scenario.xml`).
//!
//! Only the text of one element (`Scenario_Name`, a direct child of the root,
//! in the schema namespace) is ever rewritten. The document is streamed
//! event-by-event through `quick-xml`, so declaration, comments, attribute
//! order and whitespace come out exactly as they went in.

use quick_xml::events::{BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ScenarioError;

pub const DEFAULT_SCHEMA_NAMESPACE: &str = "Schema_v7.0.0";
pub const SCENARIO_NAME_ELEMENT: &str = "Scenario_Name";

const BOM: char = '\u{feff}';

#[derive(Debug, Clone)]
pub struct ScenarioDocument {
    path: PathBuf,
    source: String,
    namespace: String,
}

impl ScenarioDocument {
    pub fn load(path: &Path, namespace: &str) -> Result<Self, ScenarioError> {
        let source = fs::read_to_string(path).map_err(|e| ScenarioError::fs(path, e))?;
        Ok(Self::from_source(path, source, namespace))
    }

    pub fn from_source(path: &Path, source: String, namespace: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
            namespace: namespace.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// `{namespace}Scenario_Name`, for error messages.
    fn element_path(&self) -> String {
        format!("{{{}}}{}", self.namespace, SCENARIO_NAME_ELEMENT)
    }

    fn missing(&self) -> ScenarioError {
        ScenarioError::MissingElement {
            path: self.path.clone(),
            element: self.element_path(),
        }
    }

    fn xml_err(&self, err: impl std::fmt::Display) -> ScenarioError {
        ScenarioError::Xml {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }

    fn is_target(&self, resolved: &ResolveResult, local_name: &[u8], depth: usize) -> bool {
        if depth != 1 || local_name != SCENARIO_NAME_ELEMENT.as_bytes() {
            return false;
        }
        match resolved {
            ResolveResult::Bound(Namespace(ns)) => *ns == self.namespace.as_bytes(),
            ResolveResult::Unbound => self.namespace.is_empty(),
            ResolveResult::Unknown(_) => false,
        }
    }

    /// Current scenario name text.
    pub fn scenario_name(&self) -> Result<String, ScenarioError> {
        let mut reader = NsReader::from_str(&self.source);
        let mut depth = 0usize;
        let mut inside = false;
        let mut text = String::new();

        loop {
            let (resolved, event) = reader.read_resolved_event().map_err(|e| self.xml_err(e))?;
            match event {
                Event::Start(start) => {
                    if !inside && self.is_target(&resolved, start.local_name().as_ref(), depth) {
                        inside = true;
                    }
                    depth += 1;
                }
                Event::Empty(start) => {
                    if self.is_target(&resolved, start.local_name().as_ref(), depth) {
                        return Ok(String::new());
                    }
                }
                Event::Text(t) if inside && depth == 2 => {
                    text.push_str(&t.unescape().map_err(|e| self.xml_err(e))?);
                }
                Event::CData(c) if inside && depth == 2 => {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if inside && depth == 1 {
                        return Ok(text);
                    }
                }
                Event::Eof => return Err(self.missing()),
                _ => {}
            }
        }
    }

    /// Replace the scenario name text, leaving every other byte untouched.
    pub fn set_scenario_name(&mut self, name: &str) -> Result<(), ScenarioError> {
        let mut reader = NsReader::from_str(&self.source);
        let mut writer = Writer::new(Vec::with_capacity(self.source.len() + name.len()));
        let mut depth = 0usize;
        let mut inside = false;
        let mut replaced = false;

        loop {
            let (resolved, event) = reader.read_resolved_event().map_err(|e| self.xml_err(e))?;
            match event {
                Event::Eof => break,
                Event::Start(start) => {
                    let target = !replaced
                        && self.is_target(&resolved, start.local_name().as_ref(), depth);
                    depth += 1;
                    writer
                        .write_event(Event::Start(start))
                        .map_err(|e| self.xml_err(e))?;
                    if target {
                        writer
                            .write_event(Event::Text(BytesText::new(name)))
                            .map_err(|e| self.xml_err(e))?;
                        inside = true;
                    }
                }
                Event::Empty(start)
                    if !replaced
                        && self.is_target(&resolved, start.local_name().as_ref(), depth) =>
                {
                    let end = start.to_end().into_owned();
                    writer
                        .write_event(Event::Start(start))
                        .map_err(|e| self.xml_err(e))?;
                    writer
                        .write_event(Event::Text(BytesText::new(name)))
                        .map_err(|e| self.xml_err(e))?;
                    writer
                        .write_event(Event::End(end))
                        .map_err(|e| self.xml_err(e))?;
                    replaced = true;
                }
                Event::Text(_) | Event::CData(_) if inside && depth == 2 => {}
                Event::End(end) => {
                    depth = depth.saturating_sub(1);
                    if inside && depth == 1 {
                        inside = false;
                        replaced = true;
                    }
                    writer
                        .write_event(Event::End(end))
                        .map_err(|e| self.xml_err(e))?;
                }
                other => writer.write_event(other).map_err(|e| self.xml_err(e))?,
            }
        }

        if !replaced {
            return Err(self.missing());
        }
        let mut rewritten = String::from_utf8(writer.into_inner()).map_err(|e| self.xml_err(e))?;
        // The reader skips a leading byte-order mark; put it back.
        if self.source.starts_with(BOM) && !rewritten.starts_with(BOM) {
            rewritten.insert(0, BOM);
        }
        self.source = rewritten;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ScenarioError> {
        fs::write(&self.path, self.source.as_bytes()).map_err(|e| ScenarioError::fs(&self.path, e))
    }
}

/// Load, rename and save `scenario.xml` in one go.
pub fn rename_scenario(path: &Path, namespace: &str, name: &str) -> Result<(), ScenarioError> {
    let mut doc = ScenarioDocument::load(path, namespace)?;
    doc.set_scenario_name(name)?;
    doc.save()
}
