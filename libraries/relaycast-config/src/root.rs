//! Configuration root with transactional load and reload

use crate::catalog::{Catalog, Entity};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{ConfigError, Result, ValidationError};
use crate::intake::{Intake, IntakeType};
use crate::server::Server;
use crate::settings::{MetadataSettings, ProgramSettings};
use crate::stream::Stream;

/// Anything that can populate a [`ConfigSet`]
pub trait ConfigSource {
    /// Short description for log messages, usually a file name
    fn describe(&self) -> String;

    /// Fill `set`, which starts out empty.
    fn populate(&self, set: &mut ConfigSet) -> Result<()>;
}

/// One complete configuration buffer
///
/// Every catalog always exists, so a fresh set can be queried without
/// checking for absent collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSet {
    servers: Catalog<Server>,
    streams: Catalog<Stream>,
    intakes: Catalog<Intake>,
    decoders: Catalog<Decoder>,
    encoders: Catalog<Encoder>,
    metadata: MetadataSettings,
}

impl ConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn servers(&self) -> &Catalog<Server> {
        &self.servers
    }

    pub fn streams(&self) -> &Catalog<Stream> {
        &self.streams
    }

    pub fn intakes(&self) -> &Catalog<Intake> {
        &self.intakes
    }

    pub fn decoders(&self) -> &Catalog<Decoder> {
        &self.decoders
    }

    pub fn encoders(&self) -> &Catalog<Encoder> {
        &self.encoders
    }

    pub fn metadata(&self) -> &MetadataSettings {
        &self.metadata
    }

    pub fn servers_mut(&mut self) -> &mut Catalog<Server> {
        &mut self.servers
    }

    pub fn streams_mut(&mut self) -> &mut Catalog<Stream> {
        &mut self.streams
    }

    pub fn intakes_mut(&mut self) -> &mut Catalog<Intake> {
        &mut self.intakes
    }

    pub fn decoders_mut(&mut self) -> &mut Catalog<Decoder> {
        &mut self.decoders
    }

    pub fn encoders_mut(&mut self) -> &mut Catalog<Encoder> {
        &mut self.encoders
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataSettings {
        &mut self.metadata
    }

    /// Validate every entity and every cross-catalog reference.
    pub fn validate(&self) -> Result<()> {
        fn check<E: Entity>(catalog: &Catalog<E>) -> Result<()> {
            catalog.validate_all().map_err(|(name, err)| {
                ConfigError::Invalid(format!("{} ({}): {}", E::KIND, name, err))
            })
        }

        check(&self.servers)?;
        check(&self.streams)?;
        check(&self.intakes)?;
        check(&self.decoders)?;
        check(&self.encoders)?;

        for stream in self.streams.iter() {
            self.check_references(stream).map_err(|err| {
                ConfigError::Invalid(format!("stream ({}): {}", stream.name(), err))
            })?;
        }
        Ok(())
    }

    fn check_references(&self, stream: &Stream) -> std::result::Result<(), ValidationError> {
        if let Some(name) = stream.encoder() {
            if self.encoders.find(name).is_none() {
                return Err(ValidationError::UnknownReference {
                    kind: Encoder::KIND,
                    name: name.to_string(),
                });
            }
        }
        if let Some(name) = stream.server() {
            if self.servers.find(name).is_none() {
                return Err(ValidationError::UnknownReference {
                    kind: Server::KIND,
                    name: name.to_string(),
                });
            }
        }
        if let Some(name) = stream.intake() {
            if self.intakes.find(name).is_none() {
                return Err(ValidationError::UnknownReference {
                    kind: Intake::KIND,
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// The running configuration.
///
/// `active` is what the rest of the program reads. `staging` is the
/// scratch buffer a load or reload parses into; it is empty between
/// operations. Program settings live outside both buffers.
#[derive(Debug, Default)]
pub struct Config {
    active: ConfigSet,
    staging: ConfigSet,
    program: ProgramSettings,
}

impl Config {
    pub fn new(program: ProgramSettings) -> Self {
        Self {
            program,
            ..Self::default()
        }
    }

    /// Parse `source` into staging and make it active on success.
    ///
    /// On failure the staging buffer is discarded and the active
    /// configuration is untouched.
    pub fn load(&mut self, source: &dyn ConfigSource) -> Result<()> {
        self.staging = ConfigSet::default();
        match Self::parse(source, &mut self.staging) {
            Ok(()) => {
                std::mem::swap(&mut self.active, &mut self.staging);
                self.staging = ConfigSet::default();
                tracing::info!("{}: configuration loaded", source.describe());
                Ok(())
            }
            Err(err) => {
                self.staging = ConfigSet::default();
                Err(err)
            }
        }
    }

    /// Replace the active configuration with a fresh parse of `source`.
    ///
    /// The current configuration is parked in staging while the new one is
    /// parsed into a blank active buffer. If parsing fails the two are
    /// swapped back, so a bad reload never disturbs what is running.
    pub fn reload(&mut self, source: &dyn ConfigSource) -> Result<()> {
        std::mem::swap(&mut self.active, &mut self.staging);
        self.active = ConfigSet::default();

        let outcome = Self::parse(source, &mut self.active);
        if outcome.is_err() {
            std::mem::swap(&mut self.active, &mut self.staging);
            tracing::warn!(
                "{}: reload failed, keeping previous configuration",
                source.describe()
            );
        }
        self.staging = ConfigSet::default();
        outcome
    }

    fn parse(source: &dyn ConfigSource, target: &mut ConfigSet) -> Result<()> {
        source.populate(target)?;
        target.validate()
    }

    /// Check that direct playback has something to play: every intake
    /// except `stdin` needs a filename.
    pub fn check(&self) -> Result<()> {
        let intakes = self.active.intakes();
        if intakes.is_empty() {
            return Err(ConfigError::Invalid("no intake configured".to_string()));
        }
        for intake in intakes.iter() {
            if intake.kind() != IntakeType::Stdin && intake.filename().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "intake ({}): {}",
                    intake.name(),
                    ValidationError::Missing("intake filename")
                )));
            }
        }
        Ok(())
    }

    pub fn active(&self) -> &ConfigSet {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut ConfigSet {
        &mut self.active
    }

    pub fn servers(&self) -> &Catalog<Server> {
        self.active.servers()
    }

    pub fn streams(&self) -> &Catalog<Stream> {
        self.active.streams()
    }

    pub fn intakes(&self) -> &Catalog<Intake> {
        self.active.intakes()
    }

    pub fn decoders(&self) -> &Catalog<Decoder> {
        self.active.decoders()
    }

    pub fn encoders(&self) -> &Catalog<Encoder> {
        self.active.encoders()
    }

    pub fn metadata(&self) -> &MetadataSettings {
        self.active.metadata()
    }

    pub fn program(&self) -> &ProgramSettings {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut ProgramSettings {
        &mut self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(fn(&mut ConfigSet) -> Result<()>);

    impl ConfigSource for Fixed {
        fn describe(&self) -> String {
            "fixture".to_string()
        }

        fn populate(&self, set: &mut ConfigSet) -> Result<()> {
            (self.0)(set)
        }
    }

    fn good(set: &mut ConfigSet) -> Result<()> {
        let server = set.servers_mut().get_or_create("main").unwrap();
        server.set_hostname("stream.example.org").unwrap();
        server.set_password("hackme").unwrap();
        let intake = set.intakes_mut().get_or_create("default").unwrap();
        intake.set_filename("/srv/list.m3u").unwrap();
        Ok(())
    }

    fn other(set: &mut ConfigSet) -> Result<()> {
        let server = set.servers_mut().get_or_create("backup").unwrap();
        server.set_hostname("backup.example.org").unwrap();
        server.set_password("secret").unwrap();
        set.intakes_mut()
            .get_or_create("default")
            .unwrap()
            .set_type("stdin")
            .unwrap();
        Ok(())
    }

    fn missing_password(set: &mut ConfigSet) -> Result<()> {
        set.servers_mut()
            .get_or_create("main")
            .unwrap()
            .set_hostname("broken.example.org")
            .unwrap();
        Ok(())
    }

    fn parse_error(_: &mut ConfigSet) -> Result<()> {
        Err(ConfigError::Invalid("fixture[3]: server (main): port: invalid".into()))
    }

    #[test]
    fn fresh_config_is_queryable() {
        let config = Config::default();
        assert!(config.servers().is_empty());
        assert!(config.streams().is_empty());
        assert!(config.intakes().is_empty());
        assert!(config.decoders().is_empty());
        assert!(config.encoders().is_empty());
        assert_eq!(config.metadata().refresh_interval(), -1);
    }

    #[test]
    fn load_commits_valid_source() {
        let mut config = Config::default();
        config.load(&Fixed(good)).unwrap();
        assert_eq!(
            config.servers().find("MAIN").unwrap().hostname(),
            Some("stream.example.org")
        );
    }

    #[test]
    fn load_rejects_invalid_entities() {
        let mut config = Config::default();
        let err = config.load(&Fixed(missing_password)).unwrap_err();
        assert_eq!(err.to_string(), "server (main): password missing");
        assert!(config.servers().is_empty());
    }

    #[test]
    fn reload_replaces_on_success() {
        let mut config = Config::default();
        config.load(&Fixed(good)).unwrap();
        config.reload(&Fixed(other)).unwrap();
        assert!(config.servers().find("main").is_none());
        assert!(config.servers().find("backup").is_some());
    }

    #[test]
    fn failed_reload_keeps_previous_configuration() {
        let mut config = Config::default();
        config.load(&Fixed(good)).unwrap();
        let before = config.active().clone();

        assert!(config.reload(&Fixed(missing_password)).is_err());
        assert_eq!(config.active(), &before);

        assert!(config.reload(&Fixed(parse_error)).is_err());
        assert_eq!(config.active(), &before);
    }

    #[test]
    fn program_settings_survive_reload() {
        let mut config = Config::new(ProgramSettings {
            name: "relaycast".into(),
            verbosity: 2,
            ..ProgramSettings::default()
        });
        config.load(&Fixed(good)).unwrap();
        config.reload(&Fixed(other)).unwrap();
        assert_eq!(config.program().verbosity, 2);
        assert_eq!(config.program().name, "relaycast");
    }

    #[test]
    fn stream_references_must_resolve() {
        let mut set = ConfigSet::new();
        let stream = set.streams_mut().get_or_create("default").unwrap();
        stream.set_format("ogg").unwrap();
        stream.set_encoder("vorbis").unwrap();
        assert_eq!(
            set.validate().unwrap_err().to_string(),
            "stream (default): encoder vorbis does not exist"
        );

        let encoder = set.encoders_mut().get_or_create("Vorbis").unwrap();
        encoder.set_format("ogg").unwrap();
        encoder.set_program("oggenc -").unwrap();
        assert!(set.validate().is_ok());
    }

    #[test]
    fn check_requires_playable_intake() {
        let mut config = Config::default();
        assert!(config.check().is_err());

        config.load(&Fixed(good)).unwrap();
        assert!(config.check().is_ok());

        config
            .active_mut()
            .intakes_mut()
            .get_or_create("second")
            .unwrap();
        assert_eq!(
            config.check().unwrap_err().to_string(),
            "intake (second): intake filename missing"
        );
    }
}
