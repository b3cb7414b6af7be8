use std::time::Duration;

use assert_matches::assert_matches;

use genomicops::config::{ConfigLoader, DEFAULT_API_BASE};
use genomicops::error::GenomicOpsError;

#[test]
fn resolves_config_file_overrides() {
    let temp = tempfile::tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let path = temp.path().join("genomicops.json");
    std::fs::write(
        &path,
        serde_json::json!({
            "data_dir": data_dir.to_str().unwrap(),
            "chain_dir": "/srv/chains",
            "cache_ttl_secs": 60
        })
        .to_string(),
    )
    .unwrap();

    let settings = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(settings.api_base, DEFAULT_API_BASE);
    assert_eq!(settings.cache_ttl, Duration::from_secs(60));
    assert_eq!(settings.store.chain_dir(), "/srv/chains");
    assert_eq!(
        settings.store.binary_path().as_std_path(),
        data_dir.join("liftover").join("liftOver")
    );
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("missing.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, GenomicOpsError::ConfigRead(_));
}

#[test]
fn malformed_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("genomicops.json");
    std::fs::write(&path, "{\"timeout_secs\": \"soon\"}").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, GenomicOpsError::ConfigParse(_));
}
