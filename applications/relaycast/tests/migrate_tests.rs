use clap::Parser;
use relaycast::migrate::{migrate, MigrateCli};
use relaycast_config::{xml, Config, ConfigSet, XmlStr};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const LEGACY: &str = r#"<ezstream>
    <url>http://127.0.0.1:8000/live.mp3</url>
    <sourcepassword>hackme</sourcepassword>
    <format>MP3</format>
    <filename>/srv/music/list.m3u</filename>
    <stream_once>1</stream_once>
    <svrinfogenre>Jazz</svrinfogenre>
</ezstream>
"#;

#[test]
fn legacy_file_flag_is_required() {
    let err = MigrateCli::try_parse_from(["relaycast-cfgmigrate"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);

    let cli = MigrateCli::try_parse_from(["relaycast-cfgmigrate", "-0", "old.xml", "-v"]).unwrap();
    assert_eq!(cli.legacy, PathBuf::from("old.xml"));
    assert_eq!(cli.verbose, 1);
}

#[test]
fn migrated_document_loads_as_current_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.xml");
    fs::write(&path, LEGACY).unwrap();

    let document = migrate(&path).unwrap();
    assert!(document.contains("Source (legacy format):\n    old.xml"));

    let mut config = Config::default();
    config.load(&XmlStr::new("new.xml", document.as_str())).unwrap();
    let stream = config.streams().find("default").unwrap();
    assert_eq!(stream.mountpoint(), Some("/live.mp3"));
    assert_eq!(stream.stream_genre(), Some("Jazz"));
    assert!(config.intakes().find("default").unwrap().stream_once());

    // A second pass through the printer changes nothing
    let mut reparsed = ConfigSet::new();
    xml::read_document(&document, "new.xml", &mut reparsed).unwrap();
    assert_eq!(&reparsed, config.active());
}

#[test]
fn unreadable_legacy_file_is_reported() {
    let err = migrate(&PathBuf::from("/nonexistent/old.xml")).unwrap_err();
    assert!(format!("{:#}", err).contains("cannot migrate configuration"));
}
