#[cfg(test)]
mod integration_tests {
    use anyhow::Result;
    use layered_props::converter::{
        BoolConverter, DurationConverter, IntConverter, ListConverter, StringConverter,
    };
    use layered_props::source::{
        set_system_property, EnvironmentSource, EnvironmentSourceConfig, FileSource,
        FileSourceConfig, MapSource, RemoteSource, RemoteSourceConfig, SystemPropertySource,
        SystemPropertySourceConfig,
    };
    use layered_props::{
        ErrorContext, PropertyGroup, PropsError, Registry, RegistryConfig, ResolvedValue,
    };
    use serial_test::serial;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    type Seen = Arc<Mutex<Vec<(ErrorContext, PropsError)>>>;

    fn observed_registry() -> (Arc<Registry>, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let registry = Registry::empty(Arc::new(move |ctx: &ErrorContext, err: &PropsError| {
            seen_clone.lock().unwrap().push((ctx.clone(), err.clone()));
        }));
        (Arc::new(registry), seen)
    }

    #[test]
    fn test_lower_priority_number_wins() -> Result<()> {
        let registry = Arc::new(Registry::default());
        let env = EnvironmentSource::from_vars(
            EnvironmentSourceConfig::default(),
            vec![
                ("PORT".to_string(), "9090".to_string()),
                ("LOG_LEVEL".to_string(), "debug".to_string()),
            ],
        );
        registry.register(Arc::new(env), 10)?;
        registry.register(
            Arc::new(MapSource::with_values("defaults", [("PORT", "8080"), ("HOST", "0.0.0.0")])),
            0,
        )?;

        let port = registry.bind("PORT", IntConverter::<u16>::new(), 80)?;
        assert_eq!(port.get()?, 8080);
        assert_eq!(port.resolved(), Some(ResolvedValue::new("8080", "defaults")));

        let host = registry.bind("HOST", StringConverter, String::new())?;
        assert_eq!(host.get()?, "0.0.0.0");

        let level = registry.bind("LOG_LEVEL", StringConverter, "info".to_string())?;
        assert_eq!(level.get()?, "debug");

        let workers = registry.bind("WORKERS", IntConverter::<u32>::new(), 4)?;
        assert_eq!(workers.get()?, 4);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_process_environment() -> Result<()> {
        std::env::set_var("LAYERED_PROPS_IT_TIMEOUT", "1m30s");

        let registry = Arc::new(Registry::default());
        registry.register(
            Arc::new(EnvironmentSource::new(EnvironmentSourceConfig {
                prefix: Some("LAYERED_PROPS_IT_".to_string()),
                ..Default::default()
            })),
            10,
        )?;
        std::env::remove_var("LAYERED_PROPS_IT_TIMEOUT");

        let timeout = registry.bind("TIMEOUT", DurationConverter, Duration::from_secs(5))?;
        // 构造时读取的环境变量不会因之后的修改而变化
        assert_eq!(timeout.get()?, Duration::from_secs(90));
        assert!(registry.refresh().refreshed_sources.is_empty());
        assert_eq!(timeout.get()?, Duration::from_secs(90));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_system_properties_refresh() -> Result<()> {
        set_system_property("it.sys.mode", "blue");

        let registry = Arc::new(Registry::default());
        registry.register(
            Arc::new(SystemPropertySource::new(SystemPropertySourceConfig::default())),
            0,
        )?;
        registry.register(Arc::new(MapSource::with_values("defaults", [("it.sys.mode", "red")])), 50)?;

        let mode = registry.bind("it.sys.mode", StringConverter, String::new())?;
        assert_eq!(mode.get()?, "blue");

        set_system_property("it.sys.mode", "green");
        assert_eq!(mode.get()?, "blue");
        let report = registry.refresh();
        assert!(report.changed_keys.contains(&"it.sys.mode".to_string()));
        assert_eq!(mode.get()?, "green");

        layered_props::source::remove_system_property("it.sys.mode");
        registry.refresh();
        assert_eq!(mode.get()?, "red");
        Ok(())
    }

    #[test]
    #[serial]
    fn test_system_property_reverted_between_refreshes() -> Result<()> {
        set_system_property("it.sys.limit", "5");

        let registry = Arc::new(Registry::default());
        registry.register(
            Arc::new(SystemPropertySource::new(SystemPropertySourceConfig::default())),
            0,
        )?;
        let limit = registry.bind("it.sys.limit", IntConverter::<u32>::new(), 0)?;

        set_system_property("it.sys.limit", "6");
        assert_eq!(limit.get()?, 6);
        set_system_property("it.sys.limit", "5");

        let report = registry.refresh();
        assert!(report.changed_keys.is_empty());
        assert_eq!(report.invalidated_keys, vec!["it.sys.limit".to_string()]);
        assert_eq!(limit.get()?, 5);

        layered_props::source::remove_system_property("it.sys.limit");
        Ok(())
    }

    #[test]
    fn test_registry_from_yaml_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("app.yaml");
        fs::write(
            &path,
            r#"
server:
  port: 7070
  hosts: [a.example.com, b.example.com]
features:
  beta: true
"#,
        )?;

        let config = RegistryConfig::from_yaml(&format!(
            r#"
sources:
  - priority: 0
    source:
      type: FileSource
      options:
        path: {}
        name: app
  - priority: 10
    source:
      type: MapSource
      options:
        name: defaults
        values:
          server.port: "8080"
          server.timeout: "3s"
"#,
            path.display()
        ))?;
        let registry = Arc::new(Registry::new(config)?);

        let names: Vec<String> = registry.sources().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["app".to_string(), "defaults".to_string()]);

        let port = registry.bind("server.port", IntConverter::<u16>::new(), 0)?;
        let timeout = registry.bind("server.timeout", DurationConverter, Duration::ZERO)?;
        let hosts = registry.bind("server.hosts", ListConverter::strings(), Vec::new())?;
        let beta = registry.bind("features.beta", BoolConverter, false)?;

        assert_eq!(port.get()?, 7070);
        assert_eq!(timeout.get()?, Duration::from_secs(3));
        assert_eq!(hosts.get()?, vec!["a.example.com", "b.example.com"]);
        assert!(beta.get()?);
        Ok(())
    }

    #[test]
    fn test_malformed_reload_keeps_snapshot() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("app.properties");
        fs::write(&path, "# service\nname=orders\nretries=3\n")?;
        let path_str = path.to_string_lossy().to_string();

        let (registry, seen) = observed_registry();
        registry.register(
            Arc::new(FileSource::new(FileSourceConfig {
                path: path_str.clone(),
                ..Default::default()
            })?),
            0,
        )?;

        let retries = registry.bind("retries", IntConverter::<u32>::new(), 0)?;
        assert_eq!(retries.get()?, 3);

        fs::write(&path, "name=orders\nthis line is broken\nretries=5\n")?;
        let report = registry.refresh();
        assert_eq!(report.failed_sources, vec![path_str.clone()]);
        assert_eq!(retries.get()?, 3);

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(
                seen[0].0,
                ErrorContext::Refresh {
                    source_name: path_str.clone()
                }
            );
            assert!(matches!(&seen[0].1, PropsError::Parse { line: 2, .. }));
        }

        fs::write(&path, "name=orders\nretries=5\n")?;
        let report = registry.refresh();
        assert!(report.failed_sources.is_empty());
        assert_eq!(report.changed_keys, vec!["retries".to_string()]);
        assert_eq!(retries.get()?, 5);
        Ok(())
    }

    #[test]
    fn test_unavailable_remote_degrades_to_local() -> Result<()> {
        let mut server = mockito::Server::new();
        server.mock("GET", "/props").with_status(503).create();

        let (registry, seen) = observed_registry();
        registry.register(
            Arc::new(RemoteSource::new(RemoteSourceConfig {
                url: format!("{}/props", server.url()),
                timeout: Duration::from_millis(500),
                ..Default::default()
            })?),
            0,
        )?;
        registry.register(Arc::new(MapSource::with_values("local", [("pool.size", "8")])), 100)?;

        let pool = registry.bind("pool.size", IntConverter::<u32>::new(), 1)?;
        assert_eq!(pool.get()?, 8);
        assert_eq!(pool.resolved().unwrap().source_name(), "local");

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|(ctx, err)| {
            matches!(ctx, ErrorContext::Registration { source_name } if source_name == "remote")
                && err.is_transient()
        }));
        assert!(seen.iter().any(|(ctx, _)| {
            matches!(ctx, ErrorContext::Lookup { key, .. } if key == "pool.size")
        }));
        Ok(())
    }

    #[test]
    fn test_remote_refresh() -> Result<()> {
        let mut server = mockito::Server::new();
        let v1 = server
            .mock("GET", "/props")
            .with_status(200)
            .with_body(r#"{"db": {"host": "db-1", "port": 5432}}"#)
            .create();

        let registry = Arc::new(Registry::default());
        registry.register(
            Arc::new(RemoteSource::new(RemoteSourceConfig {
                url: format!("{}/props", server.url()),
                ..Default::default()
            })?),
            10,
        )?;

        let host = registry.bind("db.host", StringConverter, String::new())?;
        let port = registry.bind("db.port", IntConverter::<u16>::new(), 0)?;
        assert_eq!((&host, &port).render("{}:{}")?, "db-1:5432");

        v1.remove();
        server
            .mock("GET", "/props")
            .with_status(200)
            .with_body(r#"{"db": {"host": "db-2", "port": 5432}}"#)
            .create();

        let report = registry.refresh();
        assert_eq!(report.changed_keys, vec!["db.host".to_string()]);
        assert_eq!((&host, &port).render("{}:{}")?, "db-2:5432");
        Ok(())
    }

    #[test]
    fn test_int_values_survive_refresh() -> Result<()> {
        let registry = Arc::new(Registry::default());
        let source = Arc::new(MapSource::with_values("m", [("n", "0")]));
        registry.register(source.clone(), 0)?;

        let n = registry.bind("n", IntConverter::<i64>::new(), 0)?;
        for value in [i64::MIN, -1, 0, 1, 42, i64::MAX] {
            source.put("n", &n.encode(&value));
            registry.refresh();
            assert_eq!(n.get()?, value);
        }
        Ok(())
    }

    #[test]
    fn test_shared_registry_across_threads() -> Result<()> {
        let registry = Arc::new(Registry::default());
        let source = Arc::new(MapSource::with_values("m", [("limit", "10")]));
        registry.register(source.clone(), 0)?;

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let limit = registry
                        .bind("limit", IntConverter::<u32>::new(), 0)
                        .unwrap();
                    for _ in 0..1000 {
                        let v = limit.get().unwrap();
                        assert!(v == 10 || v == 20);
                    }
                })
            })
            .collect();

        source.put("limit", "20");
        registry.refresh();

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(registry.get_str("limit"), Some("20".to_string()));
        Ok(())
    }
}
