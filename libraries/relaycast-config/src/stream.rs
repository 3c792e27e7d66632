//! Stream entity: one mount point on one server

use crate::catalog::Entity;
use crate::error::ValidationError;
use crate::validate::{validate_boolean, validate_string, ValidationResult};
use std::fmt;
use std::str::FromStr;

/// Container/codec format announced to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamFormat {
    Ogg,
    Mp3,
    Webm,
    Matroska,
}

impl StreamFormat {
    // Canonical spellings come first; `vorbis` and `theora` are older names for Ogg
    const TABLE: [(Self, &'static str); 6] = [
        (Self::Ogg, "ogg"),
        (Self::Mp3, "mp3"),
        (Self::Webm, "webm"),
        (Self::Matroska, "matroska"),
        (Self::Ogg, "vorbis"),
        (Self::Ogg, "theora"),
    ];

    pub fn as_str(self) -> &'static str {
        crate::table::name_of(&Self::TABLE, self)
    }

    /// MIME type the transport announces for this format
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Ogg => "application/ogg",
            Self::Mp3 => "audio/mpeg",
            Self::Webm => "video/webm",
            Self::Matroska => "video/x-matroska",
        }
    }
}

impl FromStr for StreamFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::table::parse(&Self::TABLE, s).ok_or(ValidationError::Unsupported)
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mount point configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    name: String,
    mountpoint: Option<String>,
    intake: Option<String>,
    server: Option<String>,
    public: bool,
    format: Option<StreamFormat>,
    encoder: Option<String>,
    stream_name: Option<String>,
    stream_url: Option<String>,
    stream_genre: Option<String>,
    stream_description: Option<String>,
    stream_quality: Option<String>,
    stream_bitrate: Option<String>,
    stream_samplerate: Option<String>,
    stream_channels: Option<String>,
}

fn text(value: &str) -> ValidationResult<Option<String>> {
    Ok(Some(validate_string(value)?.to_string()))
}

impl Stream {
    pub fn set_mountpoint(&mut self, value: &str) -> ValidationResult<()> {
        self.mountpoint = text(value)?;
        Ok(())
    }

    pub fn set_intake(&mut self, value: &str) -> ValidationResult<()> {
        self.intake = text(value)?;
        Ok(())
    }

    pub fn set_server(&mut self, value: &str) -> ValidationResult<()> {
        self.server = text(value)?;
        Ok(())
    }

    pub fn set_public(&mut self, value: &str) -> ValidationResult<()> {
        self.public = validate_boolean(value)?;
        Ok(())
    }

    pub fn set_format(&mut self, value: &str) -> ValidationResult<()> {
        if value.is_empty() {
            return Err(ValidationError::Empty);
        }
        self.format = Some(value.parse()?);
        Ok(())
    }

    pub fn set_encoder(&mut self, value: &str) -> ValidationResult<()> {
        self.encoder = text(value)?;
        Ok(())
    }

    pub fn set_stream_name(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_name = text(value)?;
        Ok(())
    }

    pub fn set_stream_url(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_url = text(value)?;
        Ok(())
    }

    pub fn set_stream_genre(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_genre = text(value)?;
        Ok(())
    }

    pub fn set_stream_description(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_description = text(value)?;
        Ok(())
    }

    pub fn set_stream_quality(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_quality = text(value)?;
        Ok(())
    }

    pub fn set_stream_bitrate(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_bitrate = text(value)?;
        Ok(())
    }

    pub fn set_stream_samplerate(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_samplerate = text(value)?;
        Ok(())
    }

    pub fn set_stream_channels(&mut self, value: &str) -> ValidationResult<()> {
        self.stream_channels = text(value)?;
        Ok(())
    }

    pub fn mountpoint(&self) -> Option<&str> {
        self.mountpoint.as_deref()
    }

    /// Name of the intake feeding this stream
    pub fn intake(&self) -> Option<&str> {
        self.intake.as_deref()
    }

    /// Name of the server this stream is sent to
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Whether the server should list the stream in public directories
    pub fn public(&self) -> bool {
        self.public
    }

    pub fn format(&self) -> Option<StreamFormat> {
        self.format
    }

    /// Name of the encoder that produces `format`; unset means passthrough
    pub fn encoder(&self) -> Option<&str> {
        self.encoder.as_deref()
    }

    pub fn stream_name(&self) -> Option<&str> {
        self.stream_name.as_deref()
    }

    pub fn stream_url(&self) -> Option<&str> {
        self.stream_url.as_deref()
    }

    pub fn stream_genre(&self) -> Option<&str> {
        self.stream_genre.as_deref()
    }

    pub fn stream_description(&self) -> Option<&str> {
        self.stream_description.as_deref()
    }

    pub fn stream_quality(&self) -> Option<&str> {
        self.stream_quality.as_deref()
    }

    pub fn stream_bitrate(&self) -> Option<&str> {
        self.stream_bitrate.as_deref()
    }

    pub fn stream_samplerate(&self) -> Option<&str> {
        self.stream_samplerate.as_deref()
    }

    pub fn stream_channels(&self) -> Option<&str> {
        self.stream_channels.as_deref()
    }
}

impl Entity for Stream {
    const KIND: &'static str = "stream";

    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mountpoint: None,
            intake: None,
            server: None,
            public: false,
            format: None,
            encoder: None,
            stream_name: None,
            stream_url: None,
            stream_genre: None,
            stream_description: None,
            stream_quality: None,
            stream_bitrate: None,
            stream_samplerate: None,
            stream_channels: None,
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
            "mountpoint" => self.set_mountpoint(value)?,
            "intake" => self.set_intake(value)?,
            "server" => self.set_server(value)?,
            "public" => self.set_public(value)?,
            "format" => self.set_format(value)?,
            "encoder" => self.set_encoder(value)?,
            "stream_name" => self.set_stream_name(value)?,
            "stream_url" => self.set_stream_url(value)?,
            "stream_genre" => self.set_stream_genre(value)?,
            "stream_description" => self.set_stream_description(value)?,
            "stream_quality" => self.set_stream_quality(value)?,
            "stream_bitrate" => self.set_stream_bitrate(value)?,
            "stream_samplerate" => self.set_stream_samplerate(value)?,
            "stream_channels" => self.set_stream_channels(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.format.is_none() {
            return Err(ValidationError::Missing("format"));
        }
        Ok(())
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let public = self.public.then(|| "yes".to_string());
        let format = self.format.map(|f| f.to_string());

        [
            ("mountpoint", &self.mountpoint),
            ("intake", &self.intake),
            ("server", &self.server),
            ("public", &public),
            ("format", &format),
            ("encoder", &self.encoder),
            ("stream_name", &self.stream_name),
            ("stream_url", &self.stream_url),
            ("stream_genre", &self.stream_genre),
            ("stream_description", &self.stream_description),
            ("stream_quality", &self.stream_quality),
            ("stream_bitrate", &self.stream_bitrate),
            ("stream_samplerate", &self.stream_samplerate),
            ("stream_channels", &self.stream_channels),
        ]
        .into_iter()
        .filter_map(|(element, value)| value.clone().map(|v| (element, v)))
        .collect()
    }
}
