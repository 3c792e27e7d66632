//! Reader for the legacy single-stream configuration format
//!
//! The old format describes exactly one stream with flat elements under an
//! arbitrary root:
//!
//! ```text
//! url                          http://host:port/mountpoint
//! sourceuser sourcepassword format filename
//! metadata_progname metadata_format metadata_refreshinterval
//! playlist_program shuffle stream_once reconnect_tries      (0 or 1 / counts)
//! svrinfoname svrinfourl svrinfogenre svrinfodescription
//! svrinfobitrate svrinfochannels svrinfosamplerate svrinfoquality svrinfopublic
//! reencode/enable
//! reencode/encdec              format match decode encode
//! ```
//!
//! Everything lands in the `default` server, stream and intake. Decoders and
//! encoders are named after their `<format>`.
//!
//! Structural problems (repeated elements, bad flags, broken command
//! templates) fail the whole document. Values the current model rejects are
//! reported as warnings and left out, the way a person migrating by hand
//! would drop them.

use crate::catalog::{Catalog, Entity, DEFAULT_NAME};
use crate::error::{ConfigError, Result, ValidationError};
use crate::root::{ConfigSet, ConfigSource};
use crate::validate::{check_decoder_program, check_encoder_program, check_metadata_format, PATH_MAX};
use crate::xml::{parse_tree, Node};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Legacy config file on disk
#[derive(Debug, Clone)]
pub struct LegacyFile {
    path: PathBuf,
}

impl LegacyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for LegacyFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn populate(&self, set: &mut ConfigSet) -> Result<()> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        read_legacy(&text, &self.describe(), set).map(|_| ())
    }
}

/// Elements that may appear at most once, besides the stream info ones
const SINGLE: [&str; 13] = [
    "url",
    "sourceuser",
    "sourcepassword",
    "format",
    "filename",
    "metadata_progname",
    "metadata_format",
    "metadata_refreshinterval",
    "playlist_program",
    "shuffle",
    "stream_once",
    "reconnect_tries",
    "svrinfopublic",
];

/// Stream element names, old and new
const STREAM_INFO: [(&str, &str); 8] = [
    ("svrinfoname", "stream_name"),
    ("svrinfourl", "stream_url"),
    ("svrinfogenre", "stream_genre"),
    ("svrinfodescription", "stream_description"),
    ("svrinfobitrate", "stream_bitrate"),
    ("svrinfochannels", "stream_channels"),
    ("svrinfosamplerate", "stream_samplerate"),
    ("svrinfoquality", "stream_quality"),
];

#[derive(Debug, Default)]
struct EncDec {
    format: Option<String>,
    extension: Option<String>,
    decode: Option<String>,
    encode: Option<String>,
}

/// The legacy document, checked for structure but not yet for values
#[derive(Debug, Default)]
struct LegacyDocument {
    url: Option<String>,
    user: Option<String>,
    password: Option<String>,
    format: Option<String>,
    filename: Option<String>,
    metadata_program: Option<String>,
    metadata_format: Option<String>,
    refresh_interval: Option<i64>,
    filename_is_program: bool,
    shuffle: bool,
    stream_once: bool,
    reconnect_tries: u32,
    stream_info: Vec<(&'static str, String)>,
    public: bool,
    reencode: bool,
    encdecs: Vec<EncDec>,
}

/// Problems found while walking the document
struct Problems<'a> {
    origin: &'a str,
    list: Vec<String>,
}

impl<'a> Problems<'a> {
    fn new(origin: &'a str) -> Self {
        Self {
            origin,
            list: Vec::new(),
        }
    }

    fn at(&mut self, node: &Node, message: impl fmt::Display) {
        let msg = format!("{}[{}]: {}", self.origin, node.line, message);
        tracing::error!("{}", msg);
        self.list.push(msg);
    }

    /// Report `node` if an element of the same name was seen before.
    fn repeated(&mut self, seen: &mut HashSet<String>, node: &Node) -> bool {
        if seen.insert(node.name.clone()) {
            return false;
        }
        self.at(node, format!("cannot have multiple <{}> elements", node.name));
        true
    }

    fn flag(&mut self, node: &Node) -> Option<bool> {
        match node.value().trim() {
            "0" => Some(false),
            "1" => Some(true),
            _ => {
                self.at(node, format!("<{}> may only contain 1 or 0", node.name));
                None
            }
        }
    }

    fn number<T: std::str::FromStr>(&mut self, node: &Node, valid: impl Fn(&T) -> bool) -> Option<T> {
        let value = node.value().trim();
        match value.parse::<T>() {
            Ok(n) if valid(&n) => Some(n),
            _ => {
                self.at(node, format!("in <{}>: '{}' is invalid", node.name, value));
                None
            }
        }
    }

    fn template(
        &mut self,
        node: &Node,
        check: fn(&str) -> std::result::Result<(), ValidationError>,
    ) -> Option<String> {
        let value = node.value();
        match check(value) {
            Ok(()) => Some(value.to_string()),
            Err(e) => {
                self.at(node, format!("<{}>: {}", node.name, e));
                None
            }
        }
    }
}

impl LegacyDocument {
    fn parse(root: &Node, problems: &mut Problems<'_>) -> Self {
        let mut doc = Self::default();
        let mut seen = HashSet::new();

        // Elements without content are ignored altogether
        for node in root.children.iter().filter(|n| !n.value().is_empty() || n.name == "reencode") {
            let name = node.name.as_str();
            let single =
                SINGLE.contains(&name) || STREAM_INFO.iter().any(|(old, _)| *old == name);
            if single && problems.repeated(&mut seen, node) {
                continue;
            }
            match name {
                "url" => doc.url = Some(node.value().to_string()),
                "sourceuser" => doc.user = Some(node.value().to_string()),
                "sourcepassword" => doc.password = Some(node.value().to_string()),
                "format" => doc.format = Some(node.value().to_uppercase()),
                "filename" => {
                    if node.value().len() >= PATH_MAX {
                        problems.at(node, "path or filename in <filename> is too long");
                    } else {
                        doc.filename = Some(node.value().to_string());
                    }
                }
                "metadata_progname" => {
                    if node.value().len() >= PATH_MAX {
                        problems.at(node, "path or filename in <metadata_progname> is too long");
                    } else {
                        doc.metadata_program = Some(node.value().to_string());
                    }
                }
                "metadata_format" => {
                    doc.metadata_format = problems.template(node, check_metadata_format);
                }
                "metadata_refreshinterval" => {
                    doc.refresh_interval = problems.number(node, |n: &i64| {
                        (-1..=i64::from(i32::MAX)).contains(n)
                    });
                }
                "playlist_program" => {
                    doc.filename_is_program = problems.flag(node).unwrap_or_default();
                }
                "shuffle" => doc.shuffle = problems.flag(node).unwrap_or_default(),
                "stream_once" => doc.stream_once = problems.flag(node).unwrap_or_default(),
                "reconnect_tries" => {
                    doc.reconnect_tries = problems.number(node, |_: &u32| true).unwrap_or_default();
                }
                "svrinfopublic" => doc.public = problems.flag(node).unwrap_or_default(),
                "reencode" => doc.parse_reencode(node, problems),
                other => {
                    if let Some((_, field)) = STREAM_INFO.iter().find(|(old, _)| *old == other) {
                        doc.stream_info.push((*field, node.value().to_string()));
                    } else {
                        tracing::debug!("{}[{}]: ignoring <{}>", problems.origin, node.line, other);
                    }
                }
            }
        }
        doc
    }

    fn parse_reencode(&mut self, reencode: &Node, problems: &mut Problems<'_>) {
        let mut enable_seen = false;
        for node in &reencode.children {
            match node.name.as_str() {
                "enable" if !node.value().is_empty() => {
                    if enable_seen {
                        problems.at(node, "cannot have multiple <enable> elements");
                        continue;
                    }
                    enable_seen = true;
                    self.reencode = problems.flag(node).unwrap_or_default();
                }
                "encdec" => self.encdecs.push(Self::parse_encdec(node, problems)),
                _ => {}
            }
        }
    }

    fn parse_encdec(encdec: &Node, problems: &mut Problems<'_>) -> EncDec {
        let mut out = EncDec::default();
        let mut seen = HashSet::new();
        for node in encdec.children.iter().filter(|n| !n.value().is_empty()) {
            match node.name.as_str() {
                "format" | "match" | "decode" | "encode" if problems.repeated(&mut seen, node) => {}
                "format" => out.format = Some(node.value().to_uppercase()),
                "match" => out.extension = Some(node.value().to_lowercase()),
                "decode" => out.decode = problems.template(node, check_decoder_program),
                "encode" => out.encode = problems.template(node, check_encoder_program),
                _ => {}
            }
        }
        out
    }
}

/// Value warnings raised while building the new configuration
struct Warnings<'a> {
    origin: &'a str,
    list: Vec<String>,
}

impl Warnings<'_> {
    fn push(&mut self, message: String) {
        let msg = format!("{}: {}", self.origin, message);
        tracing::warn!("{}", msg);
        self.list.push(msg);
    }

    /// Apply one field through the entity's own setter.
    fn apply<E: Entity>(
        &mut self,
        catalog: &mut Catalog<E>,
        name: &str,
        field: &str,
        value: &str,
        context: &str,
    ) {
        if let Err(e) = E::apply(catalog, name, field, value) {
            self.push(format!("{}: {}: {}", context, e, value));
        }
    }

    /// Drop `name` from `catalog` if it does not validate.
    fn keep_if_valid<E: Entity>(&mut self, catalog: &mut Catalog<E>, name: &str, context: &str) {
        if let Some(Err(e)) = catalog.find(name).map(E::validate) {
            self.push(format!("{}: {}", context, e));
            catalog.remove(name);
        }
    }
}

/// Split `http://host:port/mount` into its parts.
fn split_url(url: &str) -> std::result::Result<(&str, &str, &str), &'static str> {
    const SCHEME: &str = "http://";
    let rest = url
        .get(..SCHEME.len())
        .filter(|scheme| scheme.eq_ignore_ascii_case(SCHEME))
        .map(|_| &url[SCHEME.len()..])
        .ok_or("not an HTTP address")?;
    let (host, rest) = rest.split_once(':').ok_or("missing port")?;
    let slash = rest.find('/').ok_or("missing mountpoint or too long port number")?;
    Ok((host, &rest[..slash], &rest[slash..]))
}

fn invalid(origin: &str, message: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid(format!("{}: {}", origin, message))
}

/// Parse a legacy document from `text` and apply it to `set`.
///
/// Returns the warnings for values that were dropped. The document as a
/// whole fails if it is malformed or if the resulting server, stream or
/// intake does not validate.
pub fn read_legacy(text: &str, origin: &str, set: &mut ConfigSet) -> Result<Vec<String>> {
    let root = parse_tree(text, origin)?;
    let mut problems = Problems::new(origin);
    let doc = LegacyDocument::parse(&root, &mut problems);
    if !problems.list.is_empty() {
        tracing::error!("{} configuration error(s) in {}", problems.list.len(), origin);
        return Err(ConfigError::Invalid(problems.list.remove(0)));
    }

    let url = doc
        .url
        .as_deref()
        .ok_or_else(|| invalid(origin, "missing <url>, not a legacy configuration?"))?;
    let (hostname, port, mountpoint) =
        split_url(url).map_err(|e| invalid(origin, format!("invalid <url>: {}", e)))?;

    for catalog_result in [
        set.servers_mut().get_or_create(DEFAULT_NAME).map(|_| ()),
        set.streams_mut().get_or_create(DEFAULT_NAME).map(|_| ()),
        set.intakes_mut().get_or_create(DEFAULT_NAME).map(|_| ()),
    ] {
        catalog_result.map_err(|e| invalid(origin, e))?;
    }

    let mut warnings = Warnings {
        origin,
        list: Vec::new(),
    };
    let w = &mut warnings;

    w.apply(set.servers_mut(), DEFAULT_NAME, "protocol", "http", "<url>");
    w.apply(set.servers_mut(), DEFAULT_NAME, "hostname", hostname, "<url>");
    w.apply(set.servers_mut(), DEFAULT_NAME, "port", port, "<url>");
    w.apply(set.streams_mut(), DEFAULT_NAME, "mountpoint", mountpoint, "<url>");

    if let Some(user) = &doc.user {
        w.apply(set.servers_mut(), DEFAULT_NAME, "user", user, "<sourceuser>");
    }
    if let Some(password) = &doc.password {
        w.apply(set.servers_mut(), DEFAULT_NAME, "password", password, "<sourcepassword>");
    }
    if let Some(format) = &doc.format {
        w.apply(set.streams_mut(), DEFAULT_NAME, "format", format, "<format>");
    }
    match doc.filename.as_deref() {
        Some(name) if name.eq_ignore_ascii_case("stdin") => {
            w.apply(set.intakes_mut(), DEFAULT_NAME, "type", "stdin", "<filename>");
        }
        Some(name) => w.apply(set.intakes_mut(), DEFAULT_NAME, "filename", name, "<filename>"),
        None => {}
    }

    let metadata = [
        ("program", doc.metadata_program.clone(), "<metadata_progname>"),
        ("format_str", doc.metadata_format.clone(), "<metadata_format>"),
        (
            "refresh_interval",
            doc.refresh_interval.map(|n| n.to_string()),
            "<metadata_refreshinterval>",
        ),
    ];
    for (field, value, context) in metadata {
        if let Some(value) = value {
            if let Err(e) = set.metadata_mut().set(field, &value) {
                w.push(format!("{}: {}: {}", context, e, value));
            }
        }
    }

    if doc.filename_is_program {
        w.apply(set.intakes_mut(), DEFAULT_NAME, "type", "program", "<playlist_program>");
    }
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    w.apply(set.intakes_mut(), DEFAULT_NAME, "shuffle", yes_no(doc.shuffle), "<shuffle>");
    w.apply(
        set.intakes_mut(),
        DEFAULT_NAME,
        "stream_once",
        yes_no(doc.stream_once),
        "<stream_once>",
    );
    w.apply(
        set.servers_mut(),
        DEFAULT_NAME,
        "reconnect_attempts",
        &doc.reconnect_tries.to_string(),
        "<reconnect_tries>",
    );

    for (field, value) in &doc.stream_info {
        let context = STREAM_INFO
            .iter()
            .find(|(_, new)| new == field)
            .map_or(*field, |(old, _)| *old);
        w.apply(set.streams_mut(), DEFAULT_NAME, field, value, &format!("<{}>", context));
    }
    w.apply(set.streams_mut(), DEFAULT_NAME, "public", yes_no(doc.public), "<svrinfopublic>");

    if doc.reencode {
        match &doc.format {
            Some(format) => w.apply(set.streams_mut(), DEFAULT_NAME, "encoder", format, "<reencode>"),
            None => w.push("<reencode>: no <format> to encode to".to_string()),
        }
    }

    for encdec in &doc.encdecs {
        let name = encdec.format.as_deref().unwrap_or(DEFAULT_NAME);
        if let Some(program) = &encdec.encode {
            w.apply(set.encoders_mut(), name, "program", program, "<encode>");
            if let Some(format) = &encdec.format {
                w.apply(set.encoders_mut(), name, "format", format, "<format> (encoder)");
            }
            w.keep_if_valid(set.encoders_mut(), name, "<encdec> (encoder)");
        }
        if let Some(program) = &encdec.decode {
            w.apply(set.decoders_mut(), name, "program", program, "<decode>");
            if let Some(ext) = &encdec.extension {
                w.apply(set.decoders_mut(), name, "file_ext", ext, "<match>");
            }
            w.keep_if_valid(set.decoders_mut(), name, "<encdec> (decoder)");
        }
    }

    if !warnings.list.is_empty() {
        tracing::warn!("{}: {} warnings", origin, warnings.list.len());
    }

    let stream = set.streams().find(DEFAULT_NAME);
    if let Some(encoder) = stream.and_then(|s| s.encoder()) {
        if set.encoders().find(encoder).is_none() {
            return Err(invalid(
                origin,
                format!("{} encoder not found due to errors", encoder),
            ));
        }
    }

    let verdicts = [
        set.servers().find(DEFAULT_NAME).map(Entity::validate),
        set.streams().find(DEFAULT_NAME).map(Entity::validate),
        set.intakes().find(DEFAULT_NAME).map(Entity::validate),
    ];
    for verdict in verdicts.into_iter().flatten() {
        verdict.map_err(|e| invalid(origin, format!("configuration invalid: {}", e)))?;
    }

    Ok(warnings.list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_split_into_host_port_and_mount() {
        assert_eq!(
            split_url("HTTP://radio.example:8000/live.ogg"),
            Ok(("radio.example", "8000", "/live.ogg"))
        );
        assert_eq!(split_url("https://h:1/m"), Err("not an HTTP address"));
        assert_eq!(split_url("http://h/m"), Err("missing port"));
        assert_eq!(
            split_url("http://h:8000"),
            Err("missing mountpoint or too long port number")
        );
        assert_eq!(split_url("ht"), Err("not an HTTP address"));
    }

    #[test]
    fn repeated_elements_fail_the_document() {
        let mut set = ConfigSet::new();
        let err = read_legacy(
            "<old>\n<url>http://h:8000/a</url>\n<url>http://h:8000/b</url>\n</old>",
            "old.xml",
            &mut set,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "old.xml[3]: cannot have multiple <url> elements");
    }

    #[test]
    fn flags_are_zero_or_one() {
        let mut set = ConfigSet::new();
        let err = read_legacy(
            "<old><url>http://h:8000/a</url><shuffle>yes</shuffle></old>",
            "old.xml",
            &mut set,
        )
        .unwrap_err();
        assert!(err.to_string().ends_with("<shuffle> may only contain 1 or 0"));
    }

    #[test]
    fn url_is_required() {
        let mut set = ConfigSet::new();
        let err = read_legacy("<old><format>MP3</format></old>", "old.xml", &mut set).unwrap_err();
        assert!(err.to_string().contains("missing <url>"));
    }

    #[test]
    fn decoder_template_needs_the_track() {
        let mut set = ConfigSet::new();
        let err = read_legacy(
            "<old><url>http://h:8000/a</url><reencode><encdec>\
             <format>VORBIS</format><decode>oggdec -o -</decode>\
             </encdec></reencode></old>",
            "old.xml",
            &mut set,
        )
        .unwrap_err();
        assert!(err.to_string().ends_with("<decode>: missing placeholder @T@"));
    }
}
