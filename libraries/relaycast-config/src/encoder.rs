//! Encoder entity: command template that produces the wire format

use crate::catalog::Entity;
use crate::error::ValidationError;
use crate::stream::StreamFormat;
use crate::validate::{check_encoder_program, validate_bounded_string, ValidationResult, PATH_MAX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoder {
    name: String,
    format: Option<StreamFormat>,
    program: Option<String>,
}

impl Encoder {
    pub fn set_format(&mut self, value: &str) -> ValidationResult<()> {
        if value.is_empty() {
            return Err(ValidationError::Empty);
        }
        self.format = Some(value.parse()?);
        Ok(())
    }

    /// Set the command template; it reads stdin, so `@T@` is not allowed.
    pub fn set_program(&mut self, value: &str) -> ValidationResult<()> {
        let value = validate_bounded_string(value, PATH_MAX)?;
        check_encoder_program(value)?;
        self.program = Some(value.to_string());
        Ok(())
    }

    pub fn format(&self) -> Option<StreamFormat> {
        self.format
    }

    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }
}

impl Entity for Encoder {
    const KIND: &'static str = "encoder";

    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            format: None,
            program: None,
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
            "format" => self.set_format(value)?,
            "program" => self.set_program(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.format.is_none() {
            return Err(ValidationError::NotSet("format"));
        }
        if self.program.is_none() {
            return Err(ValidationError::NotSet("program"));
        }
        Ok(())
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(format) = self.format {
            out.push(("format", format.to_string()));
        }
        if let Some(program) = &self.program {
            out.push(("program", program.clone()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaycast_core::Placeholder;

    #[test]
    fn program_cannot_read_the_track() {
        let mut encoder = Encoder::new("vorbis");
        assert_eq!(
            encoder.set_program("oggenc @T@"),
            Err(ValidationError::ProhibitedPlaceholder(Placeholder::Track))
        );
        assert!(encoder.set_program("oggenc -r -Q -t @t@ -").is_ok());
    }

    #[test]
    fn validate_order() {
        let mut encoder = Encoder::new("lame");
        assert_eq!(encoder.validate().unwrap_err().to_string(), "format not set");
        encoder.set_format("MP3").unwrap();
        assert_eq!(encoder.validate().unwrap_err().to_string(), "program not set");
        encoder.set_program("lame --quiet -r - -").unwrap();
        assert!(encoder.validate().is_ok());
        assert_eq!(encoder.format(), Some(StreamFormat::Mp3));
    }

    #[test]
    fn format_rejects_unknown() {
        let mut encoder = Encoder::new("x");
        assert_eq!(encoder.set_format("aac"), Err(ValidationError::Unsupported));
    }
}
