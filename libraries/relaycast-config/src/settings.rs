//! Global metadata and program settings

use crate::validate::{
    check_metadata_format, validate_boolean, validate_bounded_string, validate_int_range,
    validate_string, ValidationResult, PATH_MAX,
};
use std::path::PathBuf;

/// How track metadata is produced and pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSettings {
    program: Option<String>,
    format_str: Option<String>,
    refresh_interval: i64,
    normalize_strings: bool,
    no_updates: bool,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            program: None,
            format_str: None,
            refresh_interval: -1,
            normalize_strings: false,
            no_updates: false,
        }
    }
}

impl MetadataSettings {
    /// Program that prints metadata instead of reading tags
    pub fn set_program(&mut self, value: &str) -> ValidationResult<()> {
        self.program = Some(validate_bounded_string(value, PATH_MAX)?.to_string());
        Ok(())
    }

    pub fn set_format_str(&mut self, value: &str) -> ValidationResult<()> {
        let value = validate_string(value)?;
        check_metadata_format(value)?;
        self.format_str = Some(value.to_string());
        Ok(())
    }

    pub fn set_refresh_interval(&mut self, value: &str) -> ValidationResult<()> {
        self.refresh_interval =
            validate_int_range(value, i64::from(i32::MIN), i64::from(i32::MAX))?;
        Ok(())
    }

    pub fn set_normalize_strings(&mut self, value: &str) -> ValidationResult<()> {
        self.normalize_strings = validate_boolean(value)?;
        Ok(())
    }

    pub fn set_no_updates(&mut self, value: &str) -> ValidationResult<()> {
        self.no_updates = validate_boolean(value)?;
        Ok(())
    }

    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    pub fn format_str(&self) -> Option<&str> {
        self.format_str.as_deref()
    }

    /// Seconds between metadata refreshes; negative disables refreshing
    pub fn refresh_interval(&self) -> i64 {
        self.refresh_interval
    }

    pub fn normalize_strings(&self) -> bool {
        self.normalize_strings
    }

    pub fn no_updates(&self) -> bool {
        self.no_updates
    }

    pub(crate) fn set(&mut self, field: &str, value: &str) -> ValidationResult<bool> {
        match field {
            "program" => self.set_program(value)?,
            "format_str" => self.set_format_str(value)?,
            "refresh_interval" => self.set_refresh_interval(value)?,
            "normalize_strings" => self.set_normalize_strings(value)?,
            "no_updates" => self.set_no_updates(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub(crate) fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(program) = &self.program {
            out.push(("program", program.clone()));
        }
        if let Some(format_str) = &self.format_str {
            out.push(("format_str", format_str.clone()));
        }
        if self.refresh_interval >= 0 {
            out.push(("refresh_interval", self.refresh_interval.to_string()));
        }
        if self.normalize_strings {
            out.push(("normalize_strings", "yes".to_string()));
        }
        if self.no_updates {
            out.push(("no_updates", "yes".to_string()));
        }
        out
    }
}

/// Process-wide settings taken from the command line.
///
/// These are not part of the config document and survive a reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramSettings {
    /// Name used in log and status output
    pub name: String,
    pub config_file: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
    /// Send subprocess stderr to /dev/null
    pub quiet_stderr: bool,
    /// Print a realtime status line while streaming
    pub rtstatus_output: bool,
    pub verbosity: u8,
    /// Suppress metadata pushes regardless of the config file
    pub no_metadata_updates: bool,
    /// Normalize metadata strings regardless of the config file
    pub normalize_strings: bool,
    /// Playlist to shuffle and print instead of streaming
    pub shuffle_file: Option<PathBuf>,
}
