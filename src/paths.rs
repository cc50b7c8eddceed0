use std::collections::{BTreeMap, HashMap, HashSet};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::{self, FilePathMapping};
use crate::error::IngestError;
use crate::platform::PlatformClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    Upload,
    Link,
}

/// Where the raw MS files of a plate come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Local files transferred to object storage during ingestion.
    Upload(Vec<Utf8PathBuf>),
    /// Platform display paths of files already in storage.
    Link(Vec<String>),
}

impl FileSource {
    pub fn mode(&self) -> IngestMode {
        match self {
            FileSource::Upload(_) => IngestMode::Upload,
            FileSource::Link(_) => IngestMode::Link,
        }
    }

    /// File names as the plate map references them.
    pub fn file_names(&self) -> Vec<String> {
        match self {
            FileSource::Upload(paths) => paths
                .iter()
                .map(|path| domain::basename(path.as_str()).to_string())
                .collect(),
            FileSource::Link(paths) => paths
                .iter()
                .map(|path| domain::basename(path).to_string())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FileSource::Upload(paths) => paths.len(),
            FileSource::Link(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Local checks that need no network access.
    ///
    /// Supplied files must have distinct basenames, since the plate map
    /// references them by name alone.
    pub fn check(&self) -> Result<(), IngestError> {
        match self {
            FileSource::Upload(paths) => {
                for path in paths {
                    let path = path.as_std_path();
                    if path.is_dir() {
                        return Err(IngestError::DirectoryUpload(path.to_path_buf()));
                    }
                    if !path.is_file() {
                        return Err(IngestError::PathNotFound(path.to_path_buf()));
                    }
                }
            }
            FileSource::Link(paths) => {
                for path in paths {
                    if !domain::is_valid_folder_path(path) {
                        return Err(IngestError::InvalidFolderPath(path.clone()));
                    }
                }
            }
        }
        let mut seen = HashSet::new();
        for name in self.file_names() {
            if !seen.insert(name.clone()) {
                return Err(IngestError::DuplicateFileName(name));
            }
        }
        Ok(())
    }
}

/// Storage path of each local file once uploaded: `/{bucket}/{prefix}{name}`.
pub fn resolve_upload_paths<S: AsRef<str>>(
    local_files: &[S],
    upload_prefix: &str,
    bucket: &str,
) -> Result<FilePathMapping, IngestError> {
    let mut mapping = FilePathMapping::new();
    for file in local_files {
        let name = domain::basename(file.as_ref());
        mapping.insert(name, format!("/{bucket}/{upload_prefix}{name}"))?;
    }
    Ok(mapping)
}

/// Looks up the durable raw path of each display path, one request per folder.
///
/// Fails naming every path that is missing from its folder listing or whose
/// folder could not be listed.
pub fn resolve_linked_paths<C: PlatformClient + ?Sized>(
    client: &C,
    display_paths: &[String],
) -> Result<BTreeMap<String, String>, IngestError> {
    let tenant_id = client.tenant_id();
    let mut folders: Vec<(&str, Vec<&String>)> = Vec::new();
    for path in display_paths {
        let folder = domain::parent_folder(path);
        match folders.iter_mut().find(|(name, _)| *name == folder) {
            Some((_, paths)) => paths.push(path),
            None => folders.push((folder, vec![path])),
        }
    }

    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();
    for (folder, paths) in folders {
        let folder_key = (!folder.is_empty()).then(|| format!("{tenant_id}/{folder}"));
        let listing = match client.folder_metadata(folder_key.as_deref()) {
            Ok(listing) => listing,
            Err(err) => {
                tracing::warn!(folder, error = %err, "folder lookup failed");
                missing.extend(paths.into_iter().cloned());
                continue;
            }
        };
        let raw_paths = listing
            .into_iter()
            .map(|file| (file.key, file.raw_file_path))
            .collect::<HashMap<_, _>>();
        for path in paths {
            match raw_paths.get(&format!("{tenant_id}/{path}")) {
                Some(raw) => {
                    resolved.insert(path.clone(), raw.clone());
                }
                None => missing.push(path.clone()),
            }
        }
    }

    if !missing.is_empty() {
        return Err(IngestError::LinkedFilesNotFound(missing));
    }
    Ok(resolved)
}

/// Re-keys resolved display paths by file name to match plate-map references.
pub fn by_file_name(resolved: &BTreeMap<String, String>) -> Result<FilePathMapping, IngestError> {
    let mut mapping = FilePathMapping::new();
    for (display_path, raw_path) in resolved {
        mapping.insert(domain::basename(display_path), raw_path.clone())?;
    }
    Ok(mapping)
}
