//! Intake entity: the media source a stream reads from

use crate::catalog::Entity;
use crate::error::ValidationError;
use crate::validate::{validate_boolean, validate_bounded_string, ValidationResult, PATH_MAX};
use std::fmt;
use std::str::FromStr;

/// How the intake filename is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeType {
    /// Playlist if the name ends in `.m3u` or `.txt`, otherwise a single file
    #[default]
    Autodetect,
    File,
    Playlist,
    /// Executable that prints one track per invocation
    Program,
    Stdin,
}

impl IntakeType {
    const TABLE: [(Self, &'static str); 5] = [
        (Self::Autodetect, "autodetect"),
        (Self::File, "file"),
        (Self::Playlist, "playlist"),
        (Self::Program, "program"),
        (Self::Stdin, "stdin"),
    ];

    pub fn as_str(self) -> &'static str {
        crate::table::name_of(&Self::TABLE, self)
    }
}

impl FromStr for IntakeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::table::parse(&Self::TABLE, s).ok_or(ValidationError::Unsupported)
    }
}

impl fmt::Display for IntakeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intake {
    name: String,
    kind: IntakeType,
    filename: Option<String>,
    shuffle: bool,
    stream_once: bool,
}

impl Intake {
    pub fn set_type(&mut self, value: &str) -> ValidationResult<()> {
        if value.is_empty() {
            return Err(ValidationError::Empty);
        }
        self.kind = value.parse()?;
        Ok(())
    }

    pub fn set_filename(&mut self, value: &str) -> ValidationResult<()> {
        self.filename = Some(validate_bounded_string(value, PATH_MAX)?.to_string());
        Ok(())
    }

    pub fn set_shuffle(&mut self, value: &str) -> ValidationResult<()> {
        self.shuffle = validate_boolean(value)?;
        Ok(())
    }

    pub fn set_stream_once(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_once = validate_boolean(value)?;
        Ok(())
    }

    pub fn kind(&self) -> IntakeType {
        self.kind
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Stop after one pass instead of looping forever
    pub fn stream_once(&self) -> bool {
        self.stream_once
    }
}

impl Entity for Intake {
    const KIND: &'static str = "intake";

    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: IntakeType::default(),
            filename: None,
            shuffle: false,
            stream_once: false,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn set(&mut self, field: &str, value: &str) -> ValidationResult<bool> {
        match field {
            "type" => self.set_type(value)?,
            "filename" => self.set_filename(value)?,
            "shuffle" => self.set_shuffle(value)?,
            "stream_once" => self.set_stream_once(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.kind != IntakeType::Stdin && self.filename.is_none() {
            return Err(ValidationError::Missing("intake filename"));
        }
        Ok(())
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if self.kind != IntakeType::default() {
            out.push(("type", self.kind.to_string()));
        }
        if let Some(filename) = &self.filename {
            out.push(("filename", filename.clone()));
        }
        if self.shuffle {
            out.push(("shuffle", "yes".to_string()));
        }
        if self.stream_once {
            out.push(("stream_once", "yes".to_string()));
        }
        out
    }
}
