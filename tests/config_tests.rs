use notify_dispatch::config::{Config, EmailTransport, StoreBackend};

fn base_config() -> Config {
    Config {
        batch_amount: 2,
        email_transport: EmailTransport::Log,
        mail_relay_url: None,
        store_backend: StoreBackend::Memory,
        database_url: None,
        server_port: 8080,
    }
}

/// Test: A minimal log/memory configuration is accepted
#[test]
fn test_minimal_config_is_valid() {
    assert!(base_config().validate().is_ok());
}

/// Test: A zero batch threshold is rejected before startup
#[test]
fn test_zero_batch_amount_is_rejected() {
    let config = Config {
        batch_amount: 0,
        ..base_config()
    };

    assert!(config.validate().is_err());
}

/// Test: The relay transport requires a relay URL
#[test]
fn test_relay_transport_requires_url() {
    let config = Config {
        email_transport: EmailTransport::Relay,
        mail_relay_url: None,
        ..base_config()
    };

    assert!(config.validate().is_err());

    let config = Config {
        email_transport: EmailTransport::Relay,
        mail_relay_url: Some("http://relay.local".to_string()),
        ..base_config()
    };

    assert!(config.validate().is_ok());
}

/// Test: The postgres backend requires a database URL
#[test]
fn test_postgres_backend_requires_url() {
    let config = Config {
        store_backend: StoreBackend::Postgres,
        database_url: None,
        ..base_config()
    };

    assert!(config.validate().is_err());
}
