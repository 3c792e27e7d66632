//! XML configuration reader and printer
//!
//! The document is read into a small element tree first, then walked
//! section by section. Element names are matched case-insensitively and
//! unknown elements are skipped.
//!
//! ```text
//! relaycast
//!   servers/server     name protocol hostname port user password tls
//!                      tls_cipher_suite ca_dir ca_file client_cert
//!                      reconnect_attempts
//!   streams/stream     name mountpoint intake server public format encoder
//!                      stream_name stream_url stream_genre stream_description
//!                      stream_quality stream_bitrate stream_samplerate
//!                      stream_channels
//!   intakes/intake     name type filename shuffle stream_once
//!   media              type filename shuffle stream_once
//!   metadata           program format_str refresh_interval
//!                      normalize_strings no_updates
//!   decoders/decoder   name program file_ext...
//!   encoders/encoder   name format program
//! ```

use crate::catalog::{Catalog, Entity, DEFAULT_NAME};
use crate::error::{ConfigError, Result};
use crate::root::{ConfigSet, ConfigSource};
use crate::settings::MetadataSettings;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const ROOT_ELEMENT: &str = "relaycast";

/// Config file on disk
#[derive(Debug, Clone)]
pub struct XmlFile {
    path: PathBuf,
}

impl XmlFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for XmlFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn populate(&self, set: &mut ConfigSet) -> Result<()> {
        check_file_permissions(&self.path)?;
        let text = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        read_document(&text, &self.describe(), set)
    }
}

/// In-memory document, for tests and for reparsing printed output
#[derive(Debug, Clone)]
pub struct XmlStr {
    origin: String,
    text: String,
}

impl XmlStr {
    pub fn new(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            text: text.into(),
        }
    }
}

impl ConfigSource for XmlStr {
    fn describe(&self) -> String {
        self.origin.clone()
    }

    fn populate(&self, set: &mut ConfigSet) -> Result<()> {
        read_document(&self.text, &self.origin, set)
    }
}

/// Refuse config files others can modify; warn about ones they can read.
fn check_file_permissions(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mode = meta.permissions().mode();
    if mode & 0o022 != 0 {
        return Err(ConfigError::InsecureFile(path.to_path_buf()));
    }
    if mode & 0o044 != 0 {
        tracing::warn!("{}: group and/or world readable", path.display());
    }
    Ok(())
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) line: usize,
    pub(crate) text: String,
    pub(crate) children: Vec<Node>,
}

impl Node {
    fn new(raw_name: &[u8], line: usize) -> Self {
        Self {
            name: String::from_utf8_lossy(raw_name).to_lowercase(),
            line,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Leaf text exactly as written; setters that parse numbers, flags or
    /// keywords tolerate surrounding whitespace themselves.
    pub(crate) fn value(&self) -> &str {
        &self.text
    }
}

/// Incremental byte offset to line number conversion
struct LineCounter<'a> {
    text: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        let end = offset.min(self.text.len());
        if end > self.offset {
            self.line += self.text[self.offset..end]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.offset = end;
        }
        self.line
    }
}

pub(crate) fn malformed(origin: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Malformed {
        origin: origin.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn parse_tree(text: &str, origin: &str) -> Result<Node> {
    let mut reader = Reader::from_str(text);
    let mut lines = LineCounter::new(text);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    // Attach a finished element to its parent, or make it the root
    fn attach(
        stack: &mut [Node],
        root: &mut Option<Node>,
        node: Node,
        origin: &str,
    ) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None if root.is_none() => *root = Some(node),
            None => return Err(malformed(origin, "extra content at the end of the document")),
        }
        Ok(())
    }

    loop {
        let event = reader.read_event().map_err(|e| malformed(origin, e))?;
        let line = lines.line_at(reader.buffer_position() as usize);

        match event {
            Event::Start(e) => stack.push(Node::new(e.name().as_ref(), line)),
            Event::Empty(e) => {
                let node = Node::new(e.name().as_ref(), line);
                attach(&mut stack, &mut root, node, origin)?;
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node, origin)?;
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.decode().map_err(|e| malformed(origin, e))?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&c.decode().map_err(|e| malformed(origin, e))?);
                }
            }
            Event::GeneralRef(r) => {
                let Some(top) = stack.last_mut() else {
                    continue;
                };
                if let Some(c) = r.resolve_char_ref().map_err(|e| malformed(origin, e))? {
                    top.text.push(c);
                    continue;
                }
                let entity = r.decode().map_err(|e| malformed(origin, e))?;
                match resolve_predefined_entity(&entity) {
                    Some(s) => top.text.push_str(s),
                    None => {
                        return Err(malformed(
                            origin,
                            format!("entity '{}' not defined", entity),
                        ))
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed(origin, "premature end of document"));
    }
    root.ok_or_else(|| malformed(origin, "empty document"))
}

/// Parse `text` and apply it to `set`.
///
/// Every problem is logged with its location. Parsing carries on through
/// the remaining sections so that all errors are reported in one go; the
/// first one is returned.
pub fn read_document(text: &str, origin: &str, set: &mut ConfigSet) -> Result<()> {
    let root = parse_tree(text, origin)?;
    if root.name != ROOT_ELEMENT {
        return Err(ConfigError::WrongRoot(origin.to_string()));
    }

    let mut errors = Vec::new();
    for section in &root.children {
        match section.name.as_str() {
            "servers" => read_list(section, "server", origin, set.servers_mut(), &mut errors),
            "streams" => read_list(section, "stream", origin, set.streams_mut(), &mut errors),
            "intakes" => read_list(section, "intake", origin, set.intakes_mut(), &mut errors),
            "media" => {
                if let Err(msg) = read_entity(section, origin, set.intakes_mut()) {
                    tracing::error!("{}", msg);
                    errors.push(msg);
                }
            }
            "metadata" => read_metadata(section, origin, set.metadata_mut(), &mut errors),
            "decoders" => read_list(section, "decoder", origin, set.decoders_mut(), &mut errors),
            "encoders" => read_list(section, "encoder", origin, set.encoders_mut(), &mut errors),
            other => tracing::debug!("{}[{}]: ignoring <{}>", origin, section.line, other),
        }
    }

    match errors.into_iter().next() {
        Some(first) => Err(ConfigError::Invalid(first)),
        None => Ok(()),
    }
}

fn read_list<E: Entity>(
    section: &Node,
    item: &str,
    origin: &str,
    catalog: &mut Catalog<E>,
    errors: &mut Vec<String>,
) {
    for node in section.children.iter().filter(|n| n.name == item) {
        if let Err(msg) = read_entity(node, origin, catalog) {
            tracing::error!("{}", msg);
            errors.push(msg);
            return;
        }
    }
}

/// Apply one entity block. It starts out as the `default` entity and is
/// renamed by a `<name>` child.
fn read_entity<E: Entity>(
    node: &Node,
    origin: &str,
    catalog: &mut Catalog<E>,
) -> std::result::Result<(), String> {
    let mut name = DEFAULT_NAME.to_string();
    catalog
        .get_or_create(&name)
        .map_err(|e| format!("{}[{}]: {}: {}", origin, node.line, E::KIND, e))?;

    for child in &node.children {
        let value = child.value();
        let outcome = if child.name == "name" {
            catalog.rename(&name, value).map(|()| {
                name = value.to_string();
                true
            })
        } else {
            E::apply(catalog, &name, &child.name, value)
        };

        match outcome {
            Ok(true) => {}
            Ok(false) => tracing::debug!(
                "{}[{}]: {} ({}): ignoring <{}>",
                origin,
                child.line,
                E::KIND,
                name,
                child.name
            ),
            Err(e) => {
                return Err(format!(
                    "{}[{}]: {} ({}): {}: {}",
                    origin,
                    child.line,
                    E::KIND,
                    name,
                    child.name,
                    e
                ))
            }
        }
    }

    let verdict = catalog.find(&name).map(E::validate);
    if let Some(Err(e)) = verdict {
        catalog.remove(&name);
        return Err(format!(
            "{}[{}]: {} ({}): {}",
            origin,
            node.line,
            E::KIND,
            name,
            e
        ));
    }
    Ok(())
}

fn read_metadata(
    section: &Node,
    origin: &str,
    metadata: &mut MetadataSettings,
    errors: &mut Vec<String>,
) {
    for child in &section.children {
        if let Err(e) = metadata.set(&child.name, child.value()) {
            let msg = format!(
                "{}[{}]: metadata: {}: {}",
                origin, child.line, child.name, e
            );
            tracing::error!("{}", msg);
            errors.push(msg);
        }
    }
}

type XmlWriter = Writer<Vec<u8>>;

fn write_failed(e: impl ToString) -> ConfigError {
    ConfigError::Write(e.to_string())
}

/// Render `set` as a document that reads back to an equal `ConfigSet`.
///
/// Defaults are left out, as is the name of an entity called `default`.
pub fn print(set: &ConfigSet) -> Result<String> {
    print_document(set, None)
}

/// Like [`print`], with `comment` placed between the XML declaration and
/// the root element.
pub fn print_with_comment(set: &ConfigSet, comment: &str) -> Result<String> {
    print_document(set, Some(comment))
}

fn print_document(set: &ConfigSet, comment: Option<&str>) -> Result<String> {
    let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_failed)?;
    if let Some(comment) = comment {
        // "--" may not appear inside a comment
        let body = format!("\n{}\n", comment.replace("--", "- -"));
        xml.write_event(Event::Comment(BytesText::from_escaped(body)))
            .map_err(write_failed)?;
    }
    xml.write_event(Event::Start(BytesStart::new(ROOT_ELEMENT)))
        .map_err(write_failed)?;

    print_section(&mut xml, "servers", set.servers(), true)?;
    print_section(&mut xml, "streams", set.streams(), true)?;
    print_section(&mut xml, "intakes", set.intakes(), true)?;
    print_section(&mut xml, "decoders", set.decoders(), false)?;
    print_section(&mut xml, "encoders", set.encoders(), false)?;

    let metadata = set.metadata().fields();
    if !metadata.is_empty() {
        xml.write_event(Event::Start(BytesStart::new("metadata")))
            .map_err(write_failed)?;
        for (element, value) in metadata {
            print_leaf(&mut xml, element, &value)?;
        }
        xml.write_event(Event::End(BytesEnd::new("metadata")))
            .map_err(write_failed)?;
    }

    xml.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))
        .map_err(write_failed)?;

    let mut text = String::from_utf8(xml.into_inner()).map_err(write_failed)?;
    text.push('\n');
    Ok(text)
}

fn print_section<E: Entity>(
    xml: &mut XmlWriter,
    section: &str,
    catalog: &Catalog<E>,
    always: bool,
) -> Result<()> {
    if !always && catalog.is_empty() {
        return Ok(());
    }
    if catalog.is_empty() {
        return xml
            .write_event(Event::Empty(BytesStart::new(section)))
            .map_err(write_failed);
    }

    xml.write_event(Event::Start(BytesStart::new(section)))
        .map_err(write_failed)?;
    for entity in catalog.iter() {
        xml.write_event(Event::Start(BytesStart::new(E::KIND)))
            .map_err(write_failed)?;
        if entity.name() != DEFAULT_NAME {
            print_leaf(xml, "name", entity.name())?;
        }
        for (element, value) in entity.fields() {
            print_leaf(xml, element, &value)?;
        }
        xml.write_event(Event::End(BytesEnd::new(E::KIND)))
            .map_err(write_failed)?;
    }
    xml.write_event(Event::End(BytesEnd::new(section)))
        .map_err(write_failed)
}

fn print_leaf(xml: &mut XmlWriter, element: &str, value: &str) -> Result<()> {
    xml.write_event(Event::Start(BytesStart::new(element)))
        .map_err(write_failed)?;
    xml.write_event(Event::Text(BytesText::new(value)))
        .map_err(write_failed)?;
    xml.write_event(Event::End(BytesEnd::new(element)))
        .map_err(write_failed)
}
