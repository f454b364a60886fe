use anyhow::Result;
use bacheca_client::{BoardConfig, ConfigError, RestStore};
use bacheca_core::ChatId;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
}

// Obiettivo test: i valori mancanti nel file restano quelli di default,
// i destinatari possono essere id numerici o username.
#[test]
fn toml_file_keeps_defaults() -> Result<()> {
    let cfg = BoardConfig::from_toml(
        r#"
        store_url = "http://127.0.0.1:3000"
        store_key = "file-key"
        fetch_limit = 20
        telegram_chat_ids = [-100123, "@canale"]
        "#,
    )?;

    assert_eq!(cfg.store_url, "http://127.0.0.1:3000");
    assert_eq!(cfg.fetch_limit, 20);
    assert_eq!(
        cfg.telegram_chat_ids,
        vec![ChatId::Id(-100123), ChatId::Username("@canale".into())]
    );
    assert_eq!(cfg.table, "public_messages");
    assert_eq!(cfg.channel, "public_messages_channel");
    assert_eq!(cfg.error_dismiss_secs, 5);
    assert_eq!(cfg.telegram_api_base, "https://api.telegram.org");
    // token mancante: Telegram non configurato
    assert!(!cfg.notifier_configured());
    Ok(())
}

// Obiettivo test: l'ambiente sovrascrive il file; i nomi BACHECA_* vincono su quelli storici.
#[test]
fn environment_overrides_file() {
    let cfg = BoardConfig::default().with_env(env(&[
        ("SUPABASE_URL", "https://legacy.example"),
        ("BACHECA_STORE_URL", "https://store.example"),
        ("SUPABASE_ANON_KEY", "anon"),
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_IDS", " 42, @news ,,"),
        ("BACHECA_LOG_JSON", "true"),
        ("BACHECA_FETCH_LIMIT", "not a number"),
    ]));

    assert_eq!(cfg.store_url, "https://store.example");
    assert_eq!(cfg.store_key, "anon");
    assert_eq!(cfg.telegram_bot_token, "123:abc");
    assert_eq!(cfg.telegram_chat_ids, vec![ChatId::Id(42), ChatId::Username("@news".into())]);
    assert!(cfg.log_json);
    assert_eq!(cfg.fetch_limit, 50);
    assert!(cfg.notifier_configured());
}

#[test]
fn missing_explicit_file_is_an_error() {
    let td = tempfile::TempDir::new().unwrap();
    let err = BoardConfig::load(Some(&td.path().join("nope.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));

    let bad = td.path().join("bad.toml");
    std::fs::write(&bad, "fetch_limit = \"tanti\"").unwrap();
    let err = BoardConfig::load(Some(&bad)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

// Obiettivo test: initialize rifiuta credenziali vuote e URL non http(s),
// e ricava l'URL del websocket realtime da quello REST.
#[test]
fn store_initialize_validates_credentials() {
    let base = BoardConfig { store_key: "anon".into(), ..BoardConfig::default() };

    let err = RestStore::initialize(&base).unwrap_err();
    assert!(matches!(err, ConfigError::MissingStoreUrl));

    let cfg = BoardConfig { store_url: "https://xyz.example".into(), store_key: "  ".into(), ..base.clone() };
    assert!(matches!(RestStore::initialize(&cfg).unwrap_err(), ConfigError::MissingStoreKey));

    for url in ["not a url", "ftp://files.example"] {
        let cfg = BoardConfig { store_url: url.into(), ..base.clone() };
        assert!(
            matches!(RestStore::initialize(&cfg).unwrap_err(), ConfigError::InvalidStoreUrl { .. }),
            "{} should be rejected",
            url
        );
    }

    let cfg = BoardConfig { store_url: "https://xyz.example/".into(), ..base.clone() };
    let store = RestStore::initialize(&cfg).unwrap();
    assert_eq!(
        store.realtime_url().as_str(),
        "wss://xyz.example/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
    );

    let cfg = BoardConfig { store_url: "http://127.0.0.1:3000".into(), ..base };
    let store = RestStore::initialize(&cfg).unwrap();
    assert_eq!(store.realtime_url().scheme(), "ws");
}
