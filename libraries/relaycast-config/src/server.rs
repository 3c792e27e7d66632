//! Server entity: where a stream is sent

use crate::catalog::Entity;
use crate::error::ValidationError;
use crate::validate::{
    validate_bounded_string, validate_uint_range, ValidationResult, CIPHER_SUITE_MAX,
    CREDENTIALS_MAX, HOST_MAX, PATH_MAX,
};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_USER: &str = "source";

/// Transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    const TABLE: [(Self, &'static str); 2] = [(Self::Http, "http"), (Self::Https, "https")];

    pub fn as_str(self) -> &'static str {
        crate::table::name_of(&Self::TABLE, self)
    }
}

impl FromStr for Protocol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::table::parse(&Self::TABLE, s).ok_or(ValidationError::Unsupported)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS negotiation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Plain connections only
    None,
    /// Use TLS when the server offers it
    #[default]
    May,
    /// Refuse to connect without TLS
    Required,
}

impl TlsMode {
    const TABLE: [(Self, &'static str); 3] = [
        (Self::None, "none"),
        (Self::May, "may"),
        (Self::Required, "required"),
    ];

    pub fn as_str(self) -> &'static str {
        crate::table::name_of(&Self::TABLE, self)
    }
}

impl FromStr for TlsMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::table::parse(&Self::TABLE, s).ok_or(ValidationError::InvalidValue)
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection profile for one streaming server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    name: String,
    protocol: Protocol,
    hostname: Option<String>,
    port: u16,
    user: String,
    password: Option<String>,
    tls: TlsMode,
    tls_cipher_suite: Option<String>,
    ca_dir: Option<String>,
    ca_file: Option<String>,
    client_cert: Option<String>,
    reconnect_attempts: u32,
}

impl Server {
    pub fn set_protocol(&mut self, value: &str) -> ValidationResult<()> {
        self.protocol = value.parse()?;
        Ok(())
    }

    pub fn set_hostname(&mut self, value: &str) -> ValidationResult<()> {
        self.hostname = Some(validate_bounded_string(value, HOST_MAX)?.to_string());
        Ok(())
    }

    pub fn set_port(&mut self, value: &str) -> ValidationResult<()> {
        self.port = validate_uint_range(value, 1, u64::from(u16::MAX))? as u16;
        Ok(())
    }

    pub fn set_user(&mut self, value: &str) -> ValidationResult<()> {
        self.user = validate_bounded_string(value, CREDENTIALS_MAX)?.to_string();
        Ok(())
    }

    pub fn set_password(&mut self, value: &str) -> ValidationResult<()> {
        self.password = Some(validate_bounded_string(value, CREDENTIALS_MAX)?.to_string());
        Ok(())
    }

    pub fn set_tls(&mut self, value: &str) -> ValidationResult<()> {
        self.tls = value.parse()?;
        Ok(())
    }

    pub fn set_tls_cipher_suite(&mut self, value: &str) -> ValidationResult<()> {
        self.tls_cipher_suite = Some(validate_bounded_string(value, CIPHER_SUITE_MAX)?.to_string());
        Ok(())
    }

    pub fn set_ca_dir(&mut self, value: &str) -> ValidationResult<()> {
        self.ca_dir = Some(validate_bounded_string(value, PATH_MAX)?.to_string());
        Ok(())
    }

    pub fn set_ca_file(&mut self, value: &str) -> ValidationResult<()> {
        self.ca_file = Some(validate_bounded_string(value, PATH_MAX)?.to_string());
        Ok(())
    }

    pub fn set_client_cert(&mut self, value: &str) -> ValidationResult<()> {
        self.client_cert = Some(validate_bounded_string(value, PATH_MAX)?.to_string());
        Ok(())
    }

    pub fn set_reconnect_attempts(&mut self, value: &str) -> ValidationResult<()> {
        self.reconnect_attempts = validate_uint_range(value, 0, u64::from(u32::MAX))? as u32;
        Ok(())
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Effective TLS mode: HTTPS always requires TLS.
    pub fn tls(&self) -> TlsMode {
        if self.protocol == Protocol::Https {
            TlsMode::Required
        } else {
            self.tls
        }
    }

    pub fn tls_cipher_suite(&self) -> Option<&str> {
        self.tls_cipher_suite.as_deref()
    }

    pub fn ca_dir(&self) -> Option<&str> {
        self.ca_dir.as_deref()
    }

    pub fn ca_file(&self) -> Option<&str> {
        self.ca_file.as_deref()
    }

    pub fn client_cert(&self) -> Option<&str> {
        self.client_cert.as_deref()
    }

    /// Connection attempts before giving up; `0` retries forever.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }
}

impl Entity for Server {
    const KIND: &'static str = "server";

    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            protocol: Protocol::default(),
            hostname: None,
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: None,
            tls: TlsMode::default(),
            tls_cipher_suite: None,
            ca_dir: None,
            ca_file: None,
            client_cert: None,
            reconnect_attempts: 0,
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
            "protocol" => self.set_protocol(value)?,
            "hostname" => self.set_hostname(value)?,
            "port" => self.set_port(value)?,
            "user" => self.set_user(value)?,
            "password" => self.set_password(value)?,
            "tls" => self.set_tls(value)?,
            "tls_cipher_suite" => self.set_tls_cipher_suite(value)?,
            "ca_dir" => self.set_ca_dir(value)?,
            "ca_file" => self.set_ca_file(value)?,
            "client_cert" => self.set_client_cert(value)?,
            "reconnect_attempts" => self.set_reconnect_attempts(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.hostname.is_none() {
            return Err(ValidationError::Missing("hostname"));
        }
        if self.password.is_none() {
            return Err(ValidationError::Missing("password"));
        }
        Ok(())
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if self.protocol != Protocol::default() {
            out.push(("protocol", self.protocol.to_string()));
        }
        if let Some(v) = &self.hostname {
            out.push(("hostname", v.clone()));
        }
        if self.port != DEFAULT_PORT {
            out.push(("port", self.port.to_string()));
        }
        if self.user != DEFAULT_USER {
            out.push(("user", self.user.clone()));
        }
        if let Some(v) = &self.password {
            out.push(("password", v.clone()));
        }
        if self.tls != TlsMode::default() {
            out.push(("tls", self.tls.to_string()));
        }
        for (element, value) in [
            ("tls_cipher_suite", &self.tls_cipher_suite),
            ("ca_dir", &self.ca_dir),
            ("ca_file", &self.ca_file),
            ("client_cert", &self.client_cert),
        ] {
            if let Some(v) = value {
                out.push((element, v.clone()));
            }
        }
        if self.reconnect_attempts != 0 {
            out.push(("reconnect_attempts", self.reconnect_attempts.to_string()));
        }
        out
    }
}
