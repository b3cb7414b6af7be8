use std::sync::Mutex;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::json;

use genomicops::catalog::{
    Catalog, CatalogBuilder, RawGenomeListing, SpeciesLookup, list_species, match_species,
    normalize,
};
use genomicops::error::GenomicOpsError;
use genomicops::store::Store;
use genomicops::ucsc::UcscApi;

const TTL: Duration = Duration::from_secs(24 * 3600);

fn genome_list() -> serde_json::Value {
    json!({
        "ucscGenomes": {
            "hg38": {"scientificName": "Homo sapiens", "organism": "Human", "description": "Dec. 2013 (GRCh38/hg38)"},
            "mm10": {"scientificName": "Mus musculus", "organism": "Mouse", "description": "Dec. 2011 (GRCm38/mm10)"},
            "hg19": {"scientificName": "Homo sapiens", "organism": "Human", "description": "Feb. 2009 (GRCh37/hg19)"},
            "ailMel1": {"scientificName": "Ailuropoda melanoleuca", "organism": "Panda", "description": "Dec. 2009 (BGI-Shenzhen 1.0/ailMel1)"},
            "musFur1": {"scientificName": "Mustela putorius furo", "organism": "Ferret", "description": "Apr. 2011 (MusPutFur1.0/musFur1)"},
            "broken": {"organism": "Unknown"}
        }
    })
}

fn catalog() -> Catalog {
    let listing: RawGenomeListing = serde_json::from_value(genome_list()).unwrap();
    normalize(&listing)
}

struct MockApi {
    body: Option<String>,
    calls: Mutex<usize>,
}

impl MockApi {
    fn serving(body: String) -> Self {
        Self {
            body: Some(body),
            calls: Mutex::new(0),
        }
    }

    fn offline() -> Self {
        Self {
            body: None,
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl UcscApi for &MockApi {
    fn get(&self, path: &str, _query: &[(&str, String)]) -> Result<String, GenomicOpsError> {
        assert_eq!(path, "/list/ucscGenomes");
        *self.calls.lock().unwrap() += 1;
        self.body
            .clone()
            .ok_or_else(|| GenomicOpsError::UcscHttp("offline".to_string()))
    }
}

fn temp_store(temp: &tempfile::TempDir) -> Store {
    Store::new_with_root(Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap())
}

#[test]
fn normalize_sorts_species_and_drops_unnamed_entries() {
    let catalog = catalog();
    let names: Vec<_> = catalog
        .species
        .iter()
        .map(|species| species.scientific_name.as_str())
        .collect();
    assert_eq!(
        names,
        [
            "Ailuropoda melanoleuca",
            "Homo sapiens",
            "Mus musculus",
            "Mustela putorius furo"
        ]
    );
    assert_eq!(catalog.assembly_count(), 5);
    assert!(
        catalog
            .species
            .iter()
            .all(|species| species.count == species.assemblies.len())
    );
}

#[test]
fn normalize_is_deterministic() {
    assert_eq!(catalog(), catalog());
    assert_eq!(list_species(&catalog()), catalog().species);
}

#[test]
fn exact_match_on_scientific_or_common_name() {
    let catalog = catalog();

    let lookup = match_species("homo SAPIENS", &catalog, true);
    let found = lookup.found().unwrap();
    assert_eq!(found.matched_species, "Homo sapiens");
    let genomes: Vec<_> = found.assemblies.iter().map(|a| a.genome.as_str()).collect();
    assert_eq!(genomes, ["hg38", "hg19"]);

    let lookup = match_species("panda", &catalog, true);
    assert_eq!(lookup.found().unwrap().matched_species, "Ailuropoda melanoleuca");
}

#[test]
fn exact_mode_never_matches_substrings() {
    let lookup = match_species("mus", &catalog(), true);
    assert_matches!(lookup, SpeciesLookup::NotFound { ref query } if query == "mus");
}

#[test]
fn fuzzy_mode_matches_substrings_in_catalog_order() {
    let catalog = catalog();

    let lookup = match_species("MUS", &catalog, false);
    assert_eq!(lookup.found().unwrap().matched_species, "Mus musculus");

    let lookup = match_species("ferr", &catalog, false);
    assert_eq!(lookup.found().unwrap().matched_species, "Mustela putorius furo");
}

#[test]
fn exact_match_wins_over_earlier_substring_match() {
    // "Aaa ferretlike" sorts first and contains the query; the exact common
    // name further down still wins.
    let listing: RawGenomeListing = serde_json::from_value(json!({
        "ucscGenomes": {
            "a1": {"scientificName": "Aaa ferretlike", "organism": "Not a ferret"},
            "f1": {"scientificName": "Mustela putorius furo", "organism": "Ferret"}
        }
    }))
    .unwrap();
    let catalog = normalize(&listing);

    let lookup = match_species("ferret", &catalog, false);
    assert_eq!(lookup.found().unwrap().matched_species, "Mustela putorius furo");
}

#[test]
fn unknown_species_is_reported_not_raised() {
    let lookup = match_species("unicorn", &catalog(), false);
    assert_matches!(lookup, SpeciesLookup::NotFound { .. });
}

#[test]
fn fetch_without_cache_never_touches_disk() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    let api = MockApi::serving(genome_list().to_string());
    let builder = CatalogBuilder::new(&api, store.clone(), TTL);

    let catalog = builder.fetch_genomes(false).unwrap();
    assert_eq!(catalog.len(), 4);
    assert!(!store.cache_file().exists());
    assert_eq!(api.calls(), 1);
}

#[test]
fn fresh_cache_is_served_without_network() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);

    let api = MockApi::serving(genome_list().to_string());
    let first = CatalogBuilder::new(&api, store.clone(), TTL)
        .fetch_genomes(true)
        .unwrap();
    assert!(store.cache_file().exists());

    let offline = MockApi::offline();
    let second = CatalogBuilder::new(&offline, store, TTL)
        .fetch_genomes(true)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(offline.calls(), 0);
}

#[test]
fn stale_cache_triggers_live_fetch() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    store.write_catalog(&catalog()).unwrap();

    let api = MockApi::serving(genome_list().to_string());
    let catalog = CatalogBuilder::new(&api, store, Duration::ZERO)
        .fetch_genomes(true)
        .unwrap();
    assert_eq!(catalog.len(), 4);
    assert_eq!(api.calls(), 1);
}

#[test]
fn corrupted_cache_is_discarded_and_rewritten() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    Store::write_bytes_atomic(store.cache_file(), b"{not json").unwrap();

    let api = MockApi::serving(genome_list().to_string());
    let catalog = CatalogBuilder::new(&api, store.clone(), TTL)
        .fetch_genomes(true)
        .unwrap();
    assert_eq!(catalog.len(), 4);
    assert_eq!(api.calls(), 1);
    assert_eq!(store.read_fresh_catalog(TTL), Some(catalog));
}

#[test]
fn empty_cache_counts_as_miss() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    Store::write_bytes_atomic(store.cache_file(), b"[]").unwrap();

    let api = MockApi::serving(genome_list().to_string());
    CatalogBuilder::new(&api, store, TTL)
        .fetch_genomes(true)
        .unwrap();
    assert_eq!(api.calls(), 1);
}

#[test]
fn cache_write_failure_is_not_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let blocker = temp.path().join("not-a-directory");
    std::fs::write(&blocker, b"file").unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let store = Store::new_with_paths(
        root.join("not-a-directory").join("cache.json"),
        root.join("liftover"),
        root.join("liftover").join("chains"),
    );

    let api = MockApi::serving(genome_list().to_string());
    let catalog = CatalogBuilder::new(&api, store, TTL)
        .fetch_genomes(true)
        .unwrap();
    assert_eq!(catalog.len(), 4);
}

#[test]
fn network_failure_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let api = MockApi::offline();
    let err = CatalogBuilder::new(&api, temp_store(&temp), TTL)
        .fetch_genomes(true)
        .unwrap_err();
    assert_matches!(err, GenomicOpsError::UcscHttp(_));
}

#[test]
fn unparsable_listing_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let api = MockApi::serving("<html>maintenance</html>".to_string());
    let err = CatalogBuilder::new(&api, temp_store(&temp), TTL)
        .fetch_genomes(false)
        .unwrap_err();
    assert_matches!(err, GenomicOpsError::InvalidResponse(_));
}
