//! Tenant archiver: selects one tenant's documents for a month and packs them
//! into a single zip bundle.
//!
//! Layout of `tenant_<n>.zip`:
//!
//! ```text
//! xml_<n>/<basename>.xml
//! pdf_<n>/<basename>.pdf
//! ```
//!
//! Files are flattened under their segment. Sub-directories of the source
//! directories are not descended into.
//!
//! Entries are written in file-name order and carry the source file's
//! modification time, so the same inputs always produce the same bytes.

use crate::config::TenantEntry;
use crate::month::TargetMonth;
use chrono::{DateTime, Datelike, Local, Timelike};
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// The two recognised document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Xml,
    Pdf,
}

impl SourceKind {
    pub fn extension(self) -> &'static str {
        match self {
            SourceKind::Xml => "xml",
            SourceKind::Pdf => "pdf",
        }
    }

    /// Internal archive directory for this kind, e.g. `xml_2`.
    pub fn segment(self, tenant_index: usize) -> String {
        format!("{}_{}", self.extension(), tenant_index)
    }

    /// Kind by exact (lowercase) `.xml`/`.pdf` name suffix, so a file named
    /// just `.xml` counts too. Anything else is not a source file.
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        [SourceKind::Xml, SourceKind::Pdf]
            .into_iter()
            .find(|kind| {
                name.strip_suffix(kind.extension())
                    .is_some_and(|stem| stem.ends_with('.'))
            })
    }
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub kind: SourceKind,
    pub path: PathBuf,
    pub file_name: String,
    pub modified: SystemTime,
}

/// Files of one tenant that fall in the target month, sorted by name per kind.
#[derive(Debug, Clone, Default)]
pub struct TenantSelection {
    pub xml: Vec<SelectedFile>,
    pub pdf: Vec<SelectedFile>,
}

impl TenantSelection {
    pub fn is_empty(&self) -> bool {
        self.xml.is_empty() && self.pdf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.xml.len() + self.pdf.len()
    }

    pub fn files(&self) -> impl Iterator<Item = &SelectedFile> {
        self.xml.iter().chain(self.pdf.iter())
    }
}

/// A bundle written to disk for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    pub tenant_index: usize,
    pub path: PathBuf,
    pub xml_files: Vec<String>,
    pub pdf_files: Vec<String>,
}

impl Bundle {
    pub fn file_count(&self) -> usize {
        self.xml_files.len() + self.pdf_files.len()
    }
}

pub fn bundle_file_name(tenant_index: usize) -> String {
    format!("tenant_{tenant_index}.zip")
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("cannot read directory {path:?}: {source}")]
    DirectoryAccess { path: PathBuf, source: io::Error },
    #[error("cannot read source file {path:?}: {source}")]
    SourceRead { path: PathBuf, source: io::Error },
    #[error("cannot write bundle {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("cannot encode bundle {path:?}: {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

/// Selects the tenant's matching files without writing anything.
pub fn scan_tenant(
    tenant: &TenantEntry,
    target: TargetMonth,
) -> Result<TenantSelection, ArchiveError> {
    let xml = select_files(&tenant.xml_dir, SourceKind::Xml, target)?;
    let pdf = select_files(&tenant.pdf_dir, SourceKind::Pdf, target)?;
    Ok(TenantSelection { xml, pdf })
}

/// Builds `output_dir/tenant_<tenant_index>.zip` from the tenant's files for
/// `target`. Returns `Ok(None)` when neither directory has a match; no file is
/// created in that case.
pub fn archive_tenant(
    tenant_index: usize,
    tenant: &TenantEntry,
    target: TargetMonth,
    output_dir: &Path,
) -> Result<Option<Bundle>, ArchiveError> {
    let selection = scan_tenant(tenant, target)?;
    if selection.is_empty() {
        info!(tenant_index, %target, "No files for this tenant in the target month");
        return Ok(None);
    }
    write_bundle(tenant_index, &selection, output_dir).map(Some)
}

fn select_files(
    dir: &Path,
    kind: SourceKind,
    target: TargetMonth,
) -> Result<Vec<SelectedFile>, ArchiveError> {
    debug!(dir = %dir.display(), kind = ?kind, "Scanning source directory");
    let directory_error = |source: io::Error| {
        error!(error = ?source, dir = %dir.display(), "Failed to read source directory");
        ArchiveError::DirectoryAccess {
            path: dir.to_path_buf(),
            source,
        }
    };

    let mut selected = Vec::new();
    for entry_res in fs::read_dir(dir).map_err(directory_error)? {
        let entry = entry_res.map_err(directory_error)?;
        let path = entry.path();
        if SourceKind::of(&path) != Some(kind) {
            continue;
        }

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            // Dangling symlink: not a regular file.
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Skipping entry whose target does not exist");
                continue;
            }
            Err(source) => {
                error!(error = ?source, path = %path.display(), "Failed to stat source file");
                return Err(ArchiveError::SourceRead { path, source });
            }
        };
        if !metadata.is_file() {
            debug!(path = %path.display(), "Skipping non-file entry");
            continue;
        }
        let modified = metadata.modified().map_err(|source| ArchiveError::SourceRead {
            path: path.clone(),
            source,
        })?;
        if !target.matches(modified) {
            continue;
        }

        debug!(path = %path.display(), kind = ?kind, "Selected source file");
        selected.push(SelectedFile {
            kind,
            file_name: entry.file_name().to_string_lossy().into_owned(),
            path,
            modified,
        });
    }

    selected.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(selected)
}

/// Writes the bundle through a temporary file in `output_dir` and renames it
/// into place, replacing any bundle of the same name.
pub fn write_bundle(
    tenant_index: usize,
    selection: &TenantSelection,
    output_dir: &Path,
) -> Result<Bundle, ArchiveError> {
    let path = output_dir.join(bundle_file_name(tenant_index));
    let write_error = |source: io::Error| {
        error!(error = ?source, bundle = %path.display(), "Failed to write bundle");
        ArchiveError::Write {
            path: path.clone(),
            source,
        }
    };
    let zip_error = |source: zip::result::ZipError| {
        error!(error = ?source, bundle = %path.display(), "Failed to encode bundle");
        ArchiveError::Zip {
            path: path.clone(),
            source,
        }
    };

    fs::create_dir_all(output_dir).map_err(write_error)?;
    if path.exists() {
        warn!(bundle = %path.display(), "Replacing bundle left by an earlier run");
    }

    let staging = tempfile::Builder::new()
        .prefix(".tenant_")
        .suffix(".zip.part")
        .tempfile_in(output_dir)
        .map_err(write_error)?;

    let mut writer = ZipWriter::new(staging.as_file());
    for file in selection.files() {
        let entry_name = format!("{}/{}", file.kind.segment(tenant_index), file.file_name);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip_timestamp(file.modified));
        writer
            .start_file(entry_name.as_str(), options)
            .map_err(zip_error)?;

        let mut source = File::open(&file.path).map_err(|source| {
            error!(error = ?source, path = %file.path.display(), "Failed to open source file");
            ArchiveError::SourceRead {
                path: file.path.clone(),
                source,
            }
        })?;
        io::copy(&mut source, &mut writer).map_err(write_error)?;
        debug!(entry = %entry_name, "Added file to bundle");
    }
    writer.finish().map_err(zip_error)?;

    staging
        .persist(&path)
        .map_err(|persist| write_error(persist.error))?;

    let bundle = Bundle {
        tenant_index,
        path,
        xml_files: selection.xml.iter().map(|f| f.file_name.clone()).collect(),
        pdf_files: selection.pdf.iter().map(|f| f.file_name.clone()).collect(),
    };
    info!(
        tenant_index,
        bundle = %bundle.path.display(),
        xml = bundle.xml_files.len(),
        pdf = bundle.pdf_files.len(),
        "Bundle written"
    );
    Ok(bundle)
}

// DOS timestamps only cover 1980..=2107; anything outside gets the format's epoch.
fn zip_timestamp(modified: SystemTime) -> zip::DateTime {
    let local: DateTime<Local> = modified.into();
    u16::try_from(local.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                local.month() as u8,
                local.day() as u8,
                local.hour() as u8,
                local.minute() as u8,
                local.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}
