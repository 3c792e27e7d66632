//! Decoder entity: command template that turns a file into raw media

use crate::catalog::{Catalog, Entity};
use crate::error::ValidationError;
use crate::validate::{check_decoder_program, validate_bounded_string, ValidationResult, PATH_MAX};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoder {
    name: String,
    program: Option<String>,
    extensions: Vec<String>,
}

impl Decoder {
    /// Set the command template; it must contain exactly one `@T@`.
    pub fn set_program(&mut self, value: &str) -> ValidationResult<()> {
        let value = validate_bounded_string(value, PATH_MAX)?;
        check_decoder_program(value)?;
        self.program = Some(value.to_string());
        Ok(())
    }

    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    /// Registered file extensions, lower case, including the leading dot
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn handles(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.extensions.iter().any(|e| *e == ext)
    }
}

impl Entity for Decoder {
    const KIND: &'static str = "decoder";

    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            program: None,
            extensions: Vec::new(),
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
            "program" => self.set_program(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn apply(
        catalog: &mut Catalog<Self>,
        name: &str,
        field: &str,
        value: &str,
    ) -> ValidationResult<bool> {
        if field == "file_ext" {
            catalog.add_match(name, value)?;
            return Ok(true);
        }
        catalog.get_or_create(name)?.set(field, value)
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.program.is_none() {
            return Err(ValidationError::NotSet("program"));
        }
        if self.extensions.is_empty() {
            return Err(ValidationError::NoExtensions);
        }
        Ok(())
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(program) = &self.program {
            out.push(("program", program.clone()));
        }
        out.extend(self.extensions.iter().map(|ext| ("file_ext", ext.clone())));
        out
    }
}

impl Catalog<Decoder> {
    /// Register `ext` for decoder `name`, creating the decoder if needed.
    ///
    /// An extension belongs to at most one decoder. If another decoder
    /// already claims it, the match moves to `name`; the last registration
    /// wins and a notice is logged.
    pub fn add_match(&mut self, name: &str, ext: &str) -> ValidationResult<()> {
        let ext = validate_bounded_string(ext, PATH_MAX)?.to_lowercase();
        let new_owner = self.get_or_create(name)?.name().to_string();

        let previous = self
            .iter()
            .find(|d| d.handles(&ext))
            .map(|d| d.name().to_string());

        if let Some(previous) = previous {
            if previous.eq_ignore_ascii_case(&new_owner) {
                return Ok(());
            }
            tracing::info!(
                "{}: relocating match from {} to {}",
                ext,
                previous,
                new_owner
            );
            if let Some(old) = self.find_mut(&previous) {
                old.extensions.retain(|e| *e != ext);
            }
        }

        self.get_or_create(name)?.extensions.push(ext);
        Ok(())
    }

    /// Decoder responsible for extension `ext` (with leading dot).
    pub fn find_by_extension(&self, ext: &str) -> Option<&Decoder> {
        self.iter().find(|d| d.handles(ext))
    }

    /// Decoder responsible for the extension of `path`.
    pub fn find_for_path(&self, path: &Path) -> Option<&Decoder> {
        let ext = path.extension()?.to_str()?;
        self.find_by_extension(&format!(".{}", ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaycast_core::Placeholder;

    #[test]
    fn program_must_reference_track_once() {
        let mut decoder = Decoder::new("flac");
        assert!(decoder.set_program("flac -s -d --stdout @T@").is_ok());
        assert_eq!(
            decoder.set_program("flac -d"),
            Err(ValidationError::MissingPlaceholder(Placeholder::Track))
        );
        assert_eq!(decoder.program(), Some("flac -s -d --stdout @T@"));
    }

    #[test]
    fn validate_reports_missing_parts() {
        let mut decoders = Catalog::<Decoder>::new();
        decoders.get_or_create("ogg").unwrap();
        let ogg = decoders.find("ogg").unwrap();
        assert_eq!(ogg.validate().unwrap_err().to_string(), "program not set");

        decoders
            .get_or_create("ogg")
            .unwrap()
            .set_program("oggdec -Q -o - @T@")
            .unwrap();
        assert_eq!(
            decoders.find("ogg").unwrap().validate().unwrap_err().to_string(),
            "no file extensions registered"
        );

        decoders.add_match("ogg", ".ogg").unwrap();
        assert!(decoders.find("ogg").unwrap().validate().is_ok());
    }

    #[test]
    fn extensions_are_case_insensitive() {
        let mut decoders = Catalog::<Decoder>::new();
        decoders.add_match("mp3", ".MP3").unwrap();
        assert!(decoders.find_by_extension(".mp3").is_some());
        assert!(decoders
            .find_for_path(Path::new("/music/Track.Mp3"))
            .is_some());
        assert!(decoders.find_for_path(Path::new("/music/README")).is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut decoders = Catalog::<Decoder>::new();
        decoders.add_match("first", ".ogg").unwrap();
        decoders.add_match("first", ".oga").unwrap();
        decoders.add_match("second", ".OGG").unwrap();

        assert_eq!(decoders.find_by_extension(".ogg").unwrap().name(), "second");
        assert_eq!(decoders.find("first").unwrap().extensions(), [".oga"]);
    }

    #[test]
    fn re_adding_own_extension_is_a_no_op() {
        let mut decoders = Catalog::<Decoder>::new();
        decoders.add_match("flac", ".flac").unwrap();
        decoders.add_match("FLAC", ".flac").unwrap();
        assert_eq!(decoders.find("flac").unwrap().extensions(), [".flac"]);
    }
}
