mod common;

mod provider_tests {
    use super::common::{issue, write_rotated};
    use pem_keystore::{provider, KeyStoreConfig, ProviderKind};
    use std::time::Duration;

    const REFRESH_SECS: i64 = 5;

    // Mirrors a deployment: the reloadable provider is looked up by name,
    // configured from JSON, and a certificate renewal lands on disk while it serves.
    #[tokio::test]
    async fn reloadable_provider_serves_renewed_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let chain = dir.path().join("chain.pem");
        let key = dir.path().join("key.pem");

        let anna = issue("anna.example.org");
        write_rotated(&chain, &anna.chain_pem(), 0);
        write_rotated(&key, &anna.key_pem, 0);

        let json = serde_json::json!({
            "refresh_interval_secs": REFRESH_SECS,
            "aliases": [{ "alias": "server", "paths": [&chain, &key] }]
        })
        .to_string();
        let config = KeyStoreConfig::from_json_str(&json).unwrap();

        let store = provider::build(ProviderKind::RELOADABLE_NAME, &config).unwrap();
        store.start().unwrap();

        assert_eq!(store.aliases(), ["server"]);
        assert!(store.has_certificate("server"));
        assert!(store.has_key("server"));
        assert_eq!(store.certificate_chain("server").unwrap().len(), 2);

        let leaf = store.leaf_certificate("server").unwrap();
        assert_eq!(leaf.subject().unwrap(), "CN=anna.example.org");
        assert!(store.matches_certificate("server", Some(&leaf)));

        let key_info = store.private_key("server").unwrap();
        assert_eq!(key_info.format().as_str(), "PKCS#8");
        assert_eq!(key_info.algorithm().as_str(), "EC");

        let created = store.creation_date("server").unwrap();
        let age = time::OffsetDateTime::now_utc() - created;
        assert!(age.whole_seconds().abs() < 30);

        let bob = issue("bob.example.org");
        write_rotated(&chain, &bob.chain_pem(), 60);
        write_rotated(&key, &bob.key_pem, 60);

        tokio::time::sleep(Duration::from_secs(2 * REFRESH_SECS as u64)).await;

        let leaf = store.leaf_certificate("server").unwrap();
        assert_eq!(leaf.subject().unwrap(), "CN=bob.example.org");
        assert!(store.select("server").unwrap().key_matches_leaf());
        assert!(store.creation_date("server").unwrap() > created);

        store.shutdown_configured().await.unwrap();
    }

    #[test]
    fn static_provider_is_registered_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.pem");
        let anna = issue("anna.example.org");
        write_rotated(&path, &anna.combined_pem(), 0);

        let config = KeyStoreConfig::new().add_alias("server", [&path]);
        let store = provider::build(ProviderKind::STATIC_NAME, &config).unwrap();
        assert_eq!(store.kind(), ProviderKind::Static);
        assert!(store.select("server").unwrap().key_matches_leaf());
    }
}
