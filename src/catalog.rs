use std::collections::BTreeMap;
use std::time::Duration;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::GenomicOpsError;
use crate::store::Store;
use crate::ucsc::UcscApi;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    pub genome: String,
    pub assembly_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Species {
    pub species_key: String,
    pub scientific_name: String,
    pub common_name: String,
    pub count: usize,
    pub assemblies: Vec<Assembly>,
}

/// Species sorted by scientific name, each carrying its assemblies in
/// upstream listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub species: Vec<Species>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn assembly_count(&self) -> usize {
        self.species.iter().map(|species| species.assemblies.len()).sum()
    }
}

/// Body of `/list/ucscGenomes`: genome id to metadata, in upstream order.
#[derive(Debug, Default, Deserialize)]
pub struct RawGenomeListing {
    #[serde(rename = "ucscGenomes", default)]
    pub genomes: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGenome {
    #[serde(default)]
    scientific_name: Option<String>,
    #[serde(default)]
    organism: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesMatch {
    pub matched_species: String,
    pub assemblies: Vec<Assembly>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesLookup {
    Found(SpeciesMatch),
    NotFound { query: String },
}

impl SpeciesLookup {
    pub fn found(&self) -> Option<&SpeciesMatch> {
        match self {
            SpeciesLookup::Found(found) => Some(found),
            SpeciesLookup::NotFound { .. } => None,
        }
    }
}

impl Serialize for SpeciesLookup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SpeciesLookup::Found(found) => found.serialize(serializer),
            SpeciesLookup::NotFound { query } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    "error",
                    &format!("No assemblies found for species matching '{query}'"),
                )?;
                map.end()
            }
        }
    }
}

pub struct CatalogBuilder<A: UcscApi> {
    api: A,
    store: Store,
    ttl: Duration,
}

impl<A: UcscApi> CatalogBuilder<A> {
    pub fn new(api: A, store: Store, ttl: Duration) -> Self {
        Self { api, store, ttl }
    }

    /// Species-grouped catalog, served from the cache file while it is fresh.
    /// Cache problems never fail the call; only the live fetch can.
    pub fn fetch_genomes(&self, use_cache: bool) -> Result<Catalog, GenomicOpsError> {
        if use_cache {
            if let Some(catalog) = self.store.read_fresh_catalog(self.ttl) {
                debug!(species = catalog.len(), "serving catalog from cache");
                return Ok(catalog);
            }
        }

        info!("fetching UCSC genome list");
        let body = self.api.get("/list/ucscGenomes", &[])?;
        let listing: RawGenomeListing = serde_json::from_str(&body)
            .map_err(|err| GenomicOpsError::InvalidResponse(err.to_string()))?;
        let catalog = normalize(&listing);

        if use_cache {
            if let Err(err) = self.store.write_catalog(&catalog) {
                warn!(path = %self.store.cache_file(), %err, "could not write catalog cache");
            }
        }

        Ok(catalog)
    }
}

/// Groups raw genomes by scientific name. Entries without one cannot be
/// grouped and are dropped.
pub fn normalize(listing: &RawGenomeListing) -> Catalog {
    let mut grouped = BTreeMap::<String, Species>::new();
    let mut skipped = 0usize;

    for (genome_id, info) in &listing.genomes {
        let raw = RawGenome::deserialize(info).unwrap_or_default();
        let Some(scientific_name) = non_empty(raw.scientific_name) else {
            skipped += 1;
            continue;
        };

        let species = grouped
            .entry(scientific_name.clone())
            .or_insert_with(|| Species {
                species_key: scientific_name.clone(),
                scientific_name,
                common_name: non_empty(raw.organism).unwrap_or_else(|| genome_id.clone()),
                count: 0,
                assemblies: Vec::new(),
            });
        species.assemblies.push(Assembly {
            genome: genome_id.clone(),
            assembly_name: non_empty(raw.description).unwrap_or_else(|| genome_id.clone()),
        });
    }

    if skipped > 0 {
        debug!(skipped, "dropped genomes without a scientific name");
    }

    let species = grouped
        .into_values()
        .map(|mut species| {
            species.count = species.assemblies.len();
            species
        })
        .collect();
    Catalog { species }
}

pub fn list_species(catalog: &Catalog) -> Vec<Species> {
    catalog.species.clone()
}

/// Case-insensitive lookup by scientific or common name. An exact match
/// anywhere in the catalog wins over a substring match; substring matching
/// is skipped entirely when `exact` is set.
pub fn match_species(query: &str, catalog: &Catalog, exact: bool) -> SpeciesLookup {
    let needle = query.to_lowercase();
    let names = |species: &Species| {
        (
            species.scientific_name.to_lowercase(),
            species.common_name.to_lowercase(),
        )
    };

    let exact_hit = catalog.species.iter().find(|species| {
        let (scientific, common) = names(species);
        needle == scientific || needle == common
    });
    let hit = exact_hit.or_else(|| {
        if exact {
            return None;
        }
        catalog.species.iter().find(|species| {
            let (scientific, common) = names(species);
            scientific.contains(&needle) || common.contains(&needle)
        })
    });

    match hit {
        Some(species) => SpeciesLookup::Found(SpeciesMatch {
            matched_species: species.scientific_name.clone(),
            assemblies: species.assemblies.clone(),
        }),
        None => SpeciesLookup::NotFound {
            query: query.to_string(),
        },
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
