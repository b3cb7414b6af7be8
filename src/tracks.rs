use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::Value;
use tracing::warn;

use crate::domain::Region;
use crate::error::GenomicOpsError;
use crate::ucsc::UcscApi;

pub const DEFAULT_GENOME: &str = "hg38";
pub const DEFAULT_TRACK: &str = "knownGene";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub track_id: String,
    #[serde(rename = "shortLabel")]
    pub short_label: Option<String>,
    #[serde(rename = "longLabel")]
    pub long_label: Option<String>,
    #[serde(rename = "type")]
    pub track_type: Option<String>,
    pub group: Option<String>,
    #[serde(rename = "bigDataUrl")]
    pub big_data_url: Option<String>,
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackCatalog {
    pub genome: String,
    pub track_count: usize,
    pub tracks: Vec<TrackSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackListing {
    Found(TrackCatalog),
    NotFound { genome: String },
    /// UCSC could not be reached or answered with something other than JSON.
    Failed { genome: String, message: String },
}

impl Serialize for TrackListing {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TrackListing::Found(catalog) => catalog.serialize(serializer),
            TrackListing::NotFound { genome } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &format!("No track data found for {genome}"))?;
                map.end()
            }
            TrackListing::Failed { message, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}

/// Response of `/getData/track`; UCSC occasionally answers with plain text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Annotations {
    Json(Value),
    InvalidJson { error: String, text: String },
}

/// Top-level tracks of `genome`. Composite containers without a `type` are
/// left out. Transport failures and non-JSON bodies come back as
/// [`TrackListing::Failed`].
pub fn list_tracks<A: UcscApi>(api: &A, genome: &str) -> Result<TrackListing, GenomicOpsError> {
    let failed = |message: String| -> Result<TrackListing, GenomicOpsError> {
        warn!(genome, %message, "track listing failed");
        Ok(TrackListing::Failed {
            genome: genome.to_string(),
            message,
        })
    };

    let body = match api.get("/list/tracks", &[("genome", genome.to_string())]) {
        Ok(body) => body,
        Err(err @ (GenomicOpsError::UcscHttp(_) | GenomicOpsError::UcscStatus { .. })) => {
            return failed(format!("Failed to fetch tracks for {genome}: {err}"));
        }
        Err(err) => return Err(err),
    };
    let Ok(value) = serde_json::from_str::<Value>(&body) else {
        return failed(format!("Invalid JSON returned for {genome} tracks"));
    };

    let Some(tracks) = value.get(genome).and_then(Value::as_object) else {
        return Ok(TrackListing::NotFound {
            genome: genome.to_string(),
        });
    };

    let tracks: Vec<TrackSummary> = tracks
        .iter()
        .filter(|(_, info)| info.get("type").is_some())
        .map(|(track_id, info)| TrackSummary {
            track_id: track_id.clone(),
            short_label: string_field(info, "shortLabel"),
            long_label: string_field(info, "longLabel"),
            track_type: string_field(info, "type"),
            group: string_field(info, "group"),
            big_data_url: string_field(info, "bigDataUrl"),
            html: string_field(info, "html"),
        })
        .collect();

    Ok(TrackListing::Found(TrackCatalog {
        genome: genome.to_string(),
        track_count: tracks.len(),
        tracks,
    }))
}

pub fn annotations<A: UcscApi>(
    api: &A,
    region: &str,
    genome: &str,
    track: &str,
) -> Result<Annotations, GenomicOpsError> {
    let region: Region = region.parse()?;
    let query = [
        ("genome", genome.to_string()),
        ("track", track.to_string()),
        ("chrom", region.chrom.clone()),
        ("start", region.start.to_string()),
        ("end", region.end.to_string()),
    ];
    let body = api.get("/getData/track", &query)?;
    Ok(match serde_json::from_str(&body) {
        Ok(value) => Annotations::Json(value),
        Err(_) => Annotations::InvalidJson {
            error: "No valid JSON returned".to_string(),
            text: body,
        },
    })
}

fn string_field(info: &Value, key: &str) -> Option<String> {
    info.get(key).and_then(Value::as_str).map(str::to_string)
}
