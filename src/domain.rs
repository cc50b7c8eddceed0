use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::IngestError;

static ENTITY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 _.,()\-]+$").unwrap());

static FOLDER_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/]+(/[^/]+)*$").unwrap());

const RAW_FILE_EXTENSIONS: &[&str] = &[".d", ".d.zip", ".mzml", ".raw", ".wiff", ".wiff.scan"];

pub fn is_valid_entity_name(value: &str) -> bool {
    ENTITY_NAME_RE.is_match(value)
}

/// Relative platform folder path: no leading or trailing slash, no empty segments.
pub fn is_valid_folder_path(value: &str) -> bool {
    FOLDER_PATH_RE.is_match(value)
}

/// Extension of an MS file name as matched against the allow-list, lowercased.
///
/// Two-segment extensions such as `.wiff.scan` win over the last segment alone.
pub fn raw_file_extension(file_name: &str) -> Option<String> {
    let base = basename(file_name).to_lowercase();
    let parts = base.split('.').collect::<Vec<_>>();
    if parts.len() < 2 {
        return None;
    }
    if parts.len() >= 3 {
        let double = format!(".{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
        if RAW_FILE_EXTENSIONS.contains(&double.as_str()) {
            return Some(double);
        }
    }
    Some(format!(".{}", parts[parts.len() - 1]))
}

pub fn is_valid_raw_file_name(file_name: &str) -> bool {
    raw_file_extension(file_name)
        .map(|ext| RAW_FILE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Last `/`-separated segment, matching how plate maps reference files.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Parent folder of a platform display path; empty for top-level files.
pub fn parent_folder(path: &str) -> &str {
    path.rsplit_once('/').map(|(folder, _)| folder).unwrap_or("")
}

/// Caller-chosen plate identifier or plate name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityName(String);

impl EntityName {
    pub fn new(field: &str, value: &str) -> Result<Self, IngestError> {
        if !is_valid_entity_name(value) {
            return Err(IngestError::InvalidEntityName {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityName {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new("entity name", value)
    }
}

/// Column-naming convention of a plate map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    Legacy,
    Current,
}

impl SchemaVariant {
    pub const MARKER_COLUMN: &'static str = "Nanoparticle set";

    pub fn detect<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        if headers
            .into_iter()
            .any(|header| header == Self::MARKER_COLUMN)
        {
            SchemaVariant::Current
        } else {
            SchemaVariant::Legacy
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            SchemaVariant::Legacy => &[
                columns::MS_FILE_NAME,
                columns::SAMPLE_NAME,
                columns::SAMPLE_ID,
                columns::WELL_LOCATION,
                columns::CONTROL,
                columns::PLATE_ID,
                columns::PLATE_NAME,
            ],
            SchemaVariant::Current => &[
                columns::MS_FILE_NAME,
                columns::SAMPLE_NAME,
                columns::SAMPLE_ID,
                columns::WELL_LOCATION,
                columns::PLATE_ID,
                columns::PLATE_NAME,
            ],
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::Legacy => write!(f, "legacy"),
            SchemaVariant::Current => write!(f, "current"),
        }
    }
}

/// Header names shared by both plate-map variants.
pub mod columns {
    pub const MS_FILE_NAME: &str = "MS file name";
    pub const SAMPLE_NAME: &str = "Sample name";
    pub const SAMPLE_ID: &str = "Sample ID";
    pub const WELL_LOCATION: &str = "Well location";
    pub const CONTROL: &str = "Control";
    pub const PLATE_ID: &str = "Plate ID";
    pub const PLATE_NAME: &str = "Plate Name";
}

/// Request body entry for one sample in the batch sample call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRegistration {
    #[serde(rename = "plateID")]
    pub plate_id: String,
    #[serde(rename = "sampleID")]
    pub sample_id: String,
    #[serde(rename = "sampleName")]
    pub sample_name: String,
    #[serde(rename = "sampleUserGroup", skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    #[serde(flatten)]
    pub custom_fields: BTreeMap<String, String>,
}

impl SampleRegistration {
    /// Name of the first required field left empty, if any.
    pub fn missing_required_field(&self) -> Option<&'static str> {
        if self.plate_id.trim().is_empty() {
            Some("plateID")
        } else if self.sample_id.trim().is_empty() {
            Some("sampleID")
        } else if self.sample_name.trim().is_empty() {
            Some("sampleName")
        } else {
            None
        }
    }
}

/// Sample record returned by the platform after batch creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedSample {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub sample_id: String,
    #[serde(default)]
    pub sample_name: Option<String>,
}

/// Per-file record for the batch MS data call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsDataRegistration {
    #[serde(rename = "sampleId")]
    pub sample_id: String,
    pub sample_id_tracking: String,
    #[serde(rename = "wellLocation")]
    pub well_location: String,
    pub nanoparticle: String,
    #[serde(rename = "nanoparticleID")]
    pub nanoparticle_id: String,
    pub control: String,
    #[serde(rename = "controlID")]
    pub control_id: String,
    #[serde(rename = "instrumentName")]
    pub instrument_name: String,
    #[serde(rename = "dateSamplePrep")]
    pub date_sample_prep: String,
    #[serde(rename = "sampleVolume")]
    pub sample_volume: String,
    #[serde(rename = "peptideConcentration")]
    pub peptide_concentration: String,
    #[serde(rename = "peptideMassSample")]
    pub peptide_mass_sample: String,
    #[serde(rename = "reconVolume")]
    pub recon_volume: String,
    #[serde(rename = "dilutionFactor")]
    pub dilution_factor: String,
    #[serde(rename = "kitID")]
    pub kit_id: String,
    #[serde(rename = "assayVersion")]
    pub assay_version: String,
    #[serde(rename = "sampleTubeID")]
    pub sample_tube_id: String,
    #[serde(rename = "methodSetID")]
    pub method_set_id: String,
    #[serde(rename = "assayMethodID")]
    pub assay_method_id: String,
    #[serde(rename = "msdataUserGroup", skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    #[serde(rename = "rawFilePath")]
    pub raw_file_path: String,
}

/// MS file name (as referenced by the plate map) to durable storage path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePathMapping(BTreeMap<String, String>);

impl FilePathMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: &str, path: String) -> Result<(), IngestError> {
        if self.0.contains_key(file_name) {
            return Err(IngestError::DuplicateFileName(file_name.to_string()));
        }
        self.0.insert(file_name.to_string(), path);
        Ok(())
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.0.get(file_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilePathMapping {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(value) => Ok(value),
        serde_json::Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
