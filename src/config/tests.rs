use clap::Parser;

use super::*;

#[test]
fn defaults_resolve_to_memory_backends() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.store.backend, StoreBackend::Memory);
    assert_eq!(settings.cache.backend, CacheBackend::Memory);
    assert_eq!(settings.cache.key_prefix, "collegium");
    assert_eq!(settings.cache.detail_ttl, Duration::from_secs(3600));
    assert_eq!(settings.cache.list_ttl, Duration::from_secs(86_400));
    assert_eq!(settings.cache.feed_ttl, Duration::from_secs(300));
    assert!(settings.cache.search_reads_enabled);
    assert_eq!(settings.cache.invalidation, InvalidationMode::Auto);
    assert_eq!(settings.pagination.default_limit.get(), 10);
    assert_eq!(settings.pagination.max_limit.get(), 100);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.cache.backend = Some("memory".to_string());

    let overrides = Overrides {
        log_level: Some("debug".to_string()),
        cache_backend: Some("redis".to_string()),
        cache_url: Some("redis://127.0.0.1:6379".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(
        settings.cache.backend,
        CacheBackend::Redis {
            url: "redis://127.0.0.1:6379".to_string()
        }
    );
}

#[test]
fn postgres_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.store.backend = Some("postgres".to_string());
    raw.store.url = Some("   ".to_string());

    let err = Settings::from_raw(raw).expect_err("missing url rejected");
    assert!(matches!(err, LoadError::Invalid { key: "store.url", .. }));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.list_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.list_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn unknown_cache_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("memcached".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown backend rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.backend",
            ..
        }
    ));
}

#[test]
fn default_limit_cannot_exceed_max() {
    let mut raw = RawSettings::default();
    raw.pagination.default_limit = Some(50);
    raw.pagination.max_limit = Some(20);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn invalidation_mode_parses_case_insensitively() {
    assert_eq!(
        InvalidationMode::from_str("Generation"),
        Ok(InvalidationMode::Generation)
    );
    assert!(InvalidationMode::from_str("scan").is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = Overrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn parse_list_arguments() {
    let args = CliArgs::parse_from([
        "collegium",
        "institutions",
        "list",
        "--limit",
        "25",
        "--cursor",
        "abc",
    ]);

    match args.command {
        Command::Institutions {
            command: InstitutionCommand::Record(RecordCommand::List(list)),
        } => {
            assert_eq!(list.limit, Some(25));
            assert_eq!(list.page, None);
            assert_eq!(list.cursor.as_deref(), Some("abc"));
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn parse_global_overrides_after_subcommand() {
    let args = CliArgs::parse_from([
        "collegium",
        "cutoffs",
        "by-institute",
        "IITB",
        "--cache-backend",
        "disabled",
    ]);

    assert_eq!(args.overrides.cache_backend.as_deref(), Some("disabled"));
    match args.command {
        Command::Cutoffs {
            command: CutoffCommand::ByInstitute { code },
        } => assert_eq!(code, "IITB"),
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn parse_updates_arguments() {
    let args = CliArgs::parse_from(["collegium", "updates", "cutoffs", "--from", "5", "--to", "8"]);

    match args.command {
        Command::Updates(updates) => {
            assert_eq!(updates.kind, KindArg::Cutoffs);
            assert_eq!(updates.from_version, Some(5));
            assert_eq!(updates.to_version, Some(8));
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}
