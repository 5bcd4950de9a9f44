//! Package handling for OOXML containers
//!
//! DOCX and PPTX files are ZIP archives containing XML parts and resources.
//! A [`Package`] keeps the original container bytes next to the unpacked
//! parts, so that on save every part that was not rewritten is copied over
//! in its original compressed form, in its original position.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::read::ZipArchive;
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::adapter::{FormatAdapter, PackageKind, ScanPart};
use crate::error::{OoxmlError, Result};
use crate::xml::{self, CodecOptions, XmlDocument};

/// One entry of the container
#[derive(Debug)]
struct PartEntry {
    name: String,
    data: Vec<u8>,
}

/// A scanned part that has been parsed
#[derive(Debug)]
struct ParsedPart {
    doc: XmlDocument,
    dirty: bool,
}

/// An opened OOXML package
#[derive(Debug)]
pub struct Package {
    /// The container exactly as read
    source: Vec<u8>,
    /// Unpacked entries in container order
    entries: Vec<PartEntry>,
    index: HashMap<String, usize>,
    adapter: FormatAdapter,
    scan_parts: Vec<ScanPart>,
    /// Parsed trees; only ever holds scanned parts
    trees: HashMap<String, ParsedPart>,
    codec: CodecOptions,
}

impl Package {
    /// Open a package, choosing the adapter from the file extension
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let kind = PackageKind::from_path(&path)?;
        Self::open_with(path, kind.adapter())
    }

    /// Open a package with an explicit adapter
    pub fn open_with<P: AsRef<Path>>(path: P, adapter: FormatAdapter) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening {} as {}", path.display(), adapter.kind());
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes, adapter)
    }

    /// Unpack a container held in memory
    pub fn from_bytes(source: Vec<u8>, adapter: FormatAdapter) -> Result<Self> {
        let mut entries = Vec::new();
        let mut index = HashMap::new();

        {
            let mut archive = ZipArchive::new(Cursor::new(source.as_slice()))?;
            for i in 0..archive.len() {
                let mut file = archive.by_index(i)?;
                let name = file.name().to_string();

                let mut data = Vec::new();
                if !file.is_dir() {
                    // Checksum and inflate failures surface as io errors here
                    file.read_to_end(&mut data)
                        .map_err(|e| OoxmlError::CorruptArchive(ZipError::Io(e)))?;
                }

                index.entry(name.clone()).or_insert(entries.len());
                entries.push(PartEntry { name, data });
            }
        }

        let scan_parts = adapter.resolve(entries.iter().map(|e| e.name.as_str()))?;
        info!(
            "Opened {} package: {} parts, {} to scan",
            adapter.kind(),
            entries.len(),
            scan_parts.len()
        );

        Ok(Self {
            source,
            entries,
            index,
            adapter,
            scan_parts,
            trees: HashMap::new(),
            codec: CodecOptions::default(),
        })
    }

    /// Use different codec options for parsing and serializing scanned parts
    pub fn with_codec_options(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }

    /// The adapter driving this package
    pub fn adapter(&self) -> &FormatAdapter {
        &self.adapter
    }

    /// Package kind
    pub fn kind(&self) -> PackageKind {
        self.adapter.kind()
    }

    /// Scanned parts in scan order
    pub fn scan_parts(&self) -> &[ScanPart] {
        &self.scan_parts
    }

    /// Get a part's unpacked bytes as read from the container
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        part_bytes(&self.entries, &self.index, name)
    }

    /// Check if a part exists in the container
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Part names in container order
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// A scanned part's tree, if it has been parsed
    pub fn tree(&self, name: &str) -> Option<&XmlDocument> {
        self.trees.get(name).map(|p| &p.doc)
    }

    /// Names of scanned parts whose trees were modified
    pub fn modified_parts(&self) -> Vec<&str> {
        let mut names: Vec<_> = self
            .trees
            .iter()
            .filter(|(_, p)| p.dirty)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Parse every scanned part that is not parsed yet
    pub fn parse_all(&mut self) -> Result<()> {
        for i in 0..self.scan_parts.len() {
            self.scan_tree_mut(i)?;
        }
        Ok(())
    }

    /// The tree of the `i`-th scanned part, parsing it on first access
    pub(crate) fn scan_tree_mut(&mut self, i: usize) -> Result<&mut XmlDocument> {
        let name = &self.scan_parts[i].name;

        match self.trees.entry(name.clone()) {
            Entry::Occupied(entry) => Ok(&mut entry.into_mut().doc),
            Entry::Vacant(entry) => {
                let bytes = part_bytes(&self.entries, &self.index, name)
                    .ok_or_else(|| OoxmlError::invalid_package(self.adapter.kind(), name.clone()))?;
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    OoxmlError::malformed(name.clone(), e.valid_up_to() as u64, "part is not valid UTF-8")
                })?;
                let doc = xml::parse(text, &self.codec).map_err(|e| e.in_part(name))?;
                debug!("Parsed {} ({} bytes)", name, bytes.len());
                Ok(&mut entry.insert(ParsedPart { doc, dirty: false }).doc)
            }
        }
    }

    /// Record that a scanned part's tree changed and must be re-serialized
    pub(crate) fn mark_modified(&mut self, name: &str) {
        if let Some(part) = self.trees.get_mut(name) {
            part.dirty = true;
        }
    }

    /// Build the output container in memory
    ///
    /// Entries keep their order. Modified parts are re-serialized and written
    /// with their original compression method; every other entry is copied
    /// raw, compressed bytes and metadata included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::with_capacity(self.source.len())));

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            let modified = self
                .trees
                .get(file.name())
                .filter(|part| part.dirty);

            match modified {
                Some(part) => {
                    let mut options =
                        SimpleFileOptions::default().compression_method(file.compression());
                    if let Some(mode) = file.unix_mode() {
                        options = options.unix_permissions(mode);
                    }
                    let name = file.name().to_string();
                    drop(file);

                    let xml = xml::serialize(&part.doc, &self.codec);
                    zip.start_file(name, options)?;
                    zip.write_all(xml.as_bytes())?;
                }
                None => zip.raw_copy_file(file)?,
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Write the package to a file
    ///
    /// The whole container is built in memory and written to a temporary
    /// file next to `path`, which then replaces the destination. A failure
    /// at any point leaves an existing destination as it was.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let write_error = |source: std::io::Error| OoxmlError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        staged.write_all(&bytes).map_err(write_error)?;
        if let Some(existing) = fs::metadata(path).ok().filter(|m| m.is_file()) {
            staged
                .as_file()
                .set_permissions(existing.permissions())
                .map_err(write_error)?;
        }
        staged.persist(path).map_err(|e| write_error(e.error))?;

        info!(
            "Saved {} ({} bytes, {} parts rewritten)",
            path.display(),
            bytes.len(),
            self.modified_parts().len()
        );
        Ok(())
    }
}

fn part_bytes<'a>(
    entries: &'a [PartEntry],
    index: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a [u8]> {
    index.get(name).map(|&i| entries[i].data.as_slice())
}
