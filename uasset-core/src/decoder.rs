//! The linear decode pass: package summary first, then every table section
//! in fixed order, fail-fast.

use bytes::Bytes;

use crate::cursor::{BoundsPolicy, ByteCursor, Endian};
use crate::document::{
    AssetRegistryData, CustomVersion, ExportEntry, GatherableTextData, Generation, ImportEntry,
    NameTable, PackageDocument, PackageSummary, SoftPackageReference, Thumbnails,
};
use crate::error::DecodeError;
use crate::version::{
    ue4, ue5, VersionGate, LEGACY_VERSION_REMOVED_TEXTURE_ALLOCATIONS, LEGACY_VERSION_WITH_UE5,
    PACKAGE_FILE_TAG, PACKAGE_FILE_TAG_SWAPPED, SUPPORTED_LEGACY_FILE_VERSIONS,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Record a `{field, type, value, byte-range}` entry for every primitive
    /// read. Never changes decoded values or control flow.
    pub audit: bool,
    /// See [`BoundsPolicy`]; permissive is the compatible default.
    pub bounds: BoundsPolicy,
}

/// Decode one package buffer into a [`PackageDocument`].
///
/// One synchronous pass, no shared state: a fresh decoder is built per call.
pub fn decode_package(
    bytes: impl Into<Bytes>,
    options: &DecodeOptions,
) -> Result<PackageDocument, DecodeError> {
    PackageDecoder::new(bytes.into(), options).decode()
}

pub(crate) struct PackageDecoder {
    pub(crate) cur: ByteCursor,
    pub(crate) summary: PackageSummary,
    pub(crate) names: NameTable,
    pub(crate) gatherable_text_data: Vec<GatherableTextData>,
    pub(crate) imports: Vec<ImportEntry>,
    pub(crate) exports: Vec<ExportEntry>,
    pub(crate) depends: Vec<i32>,
    pub(crate) soft_package_references: Vec<SoftPackageReference>,
    pub(crate) thumbnails: Thumbnails,
    pub(crate) asset_registry: AssetRegistryData,
}

impl PackageDecoder {
    pub(crate) fn new(bytes: Bytes, options: &DecodeOptions) -> Self {
        Self {
            cur: ByteCursor::new(bytes, options.audit, options.bounds),
            summary: PackageSummary::default(),
            names: NameTable::default(),
            gatherable_text_data: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            depends: Vec::new(),
            soft_package_references: Vec::new(),
            thumbnails: Thumbnails::default(),
            asset_registry: AssetRegistryData::default(),
        }
    }

    pub(crate) fn decode(mut self) -> Result<PackageDocument, DecodeError> {
        self.read_summary()?;
        self.read_names()?;
        self.read_gatherable_text_data()?;
        self.read_imports()?;
        self.read_exports()?;
        self.read_depends()?;
        self.read_soft_package_references()?;
        self.read_searchable_names()?;
        self.read_thumbnails()?;
        self.read_asset_registry_data()?;
        self.read_preload_dependency();
        self.read_bulk_data_start();

        log::debug!(
            "decoded package: {} names, {} imports, {} exports",
            self.names.len(),
            self.imports.len(),
            self.exports.len()
        );

        Ok(PackageDocument {
            summary: self.summary,
            names: self.names,
            gatherable_text_data: self.gatherable_text_data,
            imports: self.imports,
            exports: self.exports,
            depends: self.depends,
            soft_package_references: self.soft_package_references,
            searchable_names: Vec::new(),
            thumbnails: self.thumbnails,
            asset_registry: self.asset_registry,
            audit_trail: self.cur.into_audit_entries(),
        })
    }

    pub(crate) fn gate(&self) -> VersionGate {
        VersionGate {
            legacy_file_version: self.summary.legacy_file_version,
            file_version_ue4: self.summary.file_version_ue4,
            file_version_ue5: self.summary.file_version_ue5,
        }
    }

    /// The package summary is a single linear state machine: a fixed prefix,
    /// then a long run of version-gated optional fields whose exact order
    /// decides every later file offset.
    fn read_summary(&mut self) -> Result<(), DecodeError> {
        let tag = self.cur.u32("EPackageFileTag")?;
        self.summary.package_file_tag = tag;
        if tag == PACKAGE_FILE_TAG_SWAPPED {
            // saved with the opposite endianness; flip the rest of the file
            log::warn!("byte-swapped package tag, reading as big-endian");
            self.cur.set_endian(Endian::Big);
        }
        if tag != PACKAGE_FILE_TAG && tag != PACKAGE_FILE_TAG_SWAPPED {
            return Err(DecodeError::InvalidMagic { tag });
        }

        self.summary.legacy_file_version = self.cur.i32("LegacyFileVersion")?;
        if !SUPPORTED_LEGACY_FILE_VERSIONS.contains(&self.summary.legacy_file_version) {
            return Err(DecodeError::UnsupportedVersion {
                legacy_file_version: self.summary.legacy_file_version,
            });
        }

        // consumed but unused; always differs from the marker that would
        // change the header shape
        self.summary.legacy_ue3_version = self.cur.i32("LegacyUE3Version")?;

        self.summary.file_version_ue4 = self.cur.i32("FileVersionUE4")?;
        if self.summary.legacy_file_version <= LEGACY_VERSION_WITH_UE5 {
            self.summary.file_version_ue5 = Some(self.cur.i32("FileVersionUE5")?);
        }

        self.summary.file_version_licensee_ue4 = self.cur.i32("FileVersionLicenseeUE4")?;
        // only a third-generation header can be unversioned: the check needs
        // all three counters serialized and zero
        if self.summary.file_version_ue4 == 0
            && self.summary.file_version_licensee_ue4 == 0
            && self.summary.file_version_ue5 == Some(0)
        {
            return Err(DecodeError::Unversioned);
        }

        let count = self.cur.i32("CustomVersions Count")?;
        for idx in 0..count {
            let key = self.cur.guid_slotted(&format!("CustomVersions #{idx}: key"))?;
            let version = self.cur.i32(&format!("CustomVersions #{idx}: version"))?;
            self.summary.custom_versions.push(CustomVersion { key, version });
        }

        self.summary.total_header_size = self.cur.i32("TotalHeaderSize")?;
        self.summary.folder_name = self.cur.fstring("FolderName")?;
        self.summary.package_flags = self.cur.u32("PackageFlags")?;
        self.summary.name_count = self.cur.i32("NameCount")?;
        self.summary.name_offset = self.cur.i32("NameOffset")?;

        let gate = self.gate();

        if gate.ue5_at_least(ue5::ADD_SOFTOBJECTPATH_LIST) {
            self.summary.soft_object_paths_count = Some(self.cur.u32("SoftObjectPathsCount")?);
            self.summary.soft_object_paths_offset = Some(self.cur.u32("SoftObjectPathsOffset")?);
        }

        if gate.ue4_at_least(ue4::ADDED_PACKAGE_SUMMARY_LOCALIZATION_ID) {
            self.summary.localization_id = Some(self.cur.fstring("LocalizationId")?);
        }

        if gate.ue4_at_least(ue4::SERIALIZE_TEXT_IN_PACKAGES) {
            self.summary.gatherable_text_data_count =
                Some(self.cur.i32("GatherableTextDataCount")?);
            self.summary.gatherable_text_data_offset =
                Some(self.cur.i32("GatherableTextDataOffset")?);
        }

        self.summary.export_count = self.cur.i32("ExportCount")?;
        self.summary.export_offset = self.cur.i32("ExportOffset")?;
        self.summary.import_count = self.cur.i32("ImportCount")?;
        self.summary.import_offset = self.cur.i32("ImportOffset")?;
        self.summary.depends_offset = self.cur.i32("DependsOffset")?;

        if gate.ue4_before(ue4::OLDEST_LOADABLE_PACKAGE) {
            return Err(DecodeError::AssetTooOld {
                file_version_ue4: self.summary.file_version_ue4,
            });
        }

        if gate.ue4_at_least(ue4::ADD_STRING_ASSET_REFERENCES_MAP) {
            self.summary.soft_package_references_count =
                Some(self.cur.i32("SoftPackageReferencesCount")?);
            self.summary.soft_package_references_offset =
                Some(self.cur.i32("SoftPackageReferencesOffset")?);
        }

        if gate.ue4_at_least(ue4::ADDED_SEARCHABLE_NAMES) {
            self.summary.searchable_names_offset = Some(self.cur.i32("SearchableNamesOffset")?);
        }

        self.summary.thumbnail_table_offset = self.cur.i32("ThumbnailTableOffset")?;
        self.summary.guid = self.cur.guid_plain("Guid")?;

        if gate.ue4_at_least(ue4::ADDED_PACKAGE_OWNER) {
            self.summary.persistent_guid = Some(self.cur.guid_plain("PersistentGuid")?);
        }
        if gate.ue4_at_least(ue4::ADDED_PACKAGE_OWNER)
            && gate.ue4_before(ue4::NON_OUTER_PACKAGE_IMPORT)
        {
            self.summary.owner_persistent_guid =
                Some(self.cur.guid_plain("OwnerPersistentGuid")?);
        }

        let count = self.cur.i32("Generations Count")?;
        for idx in 0..count {
            let export_count = self.cur.i32(&format!("Generations #{idx}: export count"))?;
            let name_count = self.cur.i32(&format!("Generations #{idx}: name count"))?;
            self.summary.generations.push(Generation {
                export_count,
                name_count,
            });
        }

        if gate.ue4_at_least(ue4::ENGINE_VERSION_OBJECT) {
            self.summary.saved_by_engine_version =
                self.read_engine_version("SavedByEngineVersion")?;
        } else {
            self.summary.engine_changelist = Some(self.cur.i32("EngineChangelist")?);
        }

        if gate.ue4_at_least(ue4::PACKAGE_SUMMARY_HAS_COMPATIBLE_ENGINE_VERSION) {
            self.summary.compatible_with_engine_version =
                self.read_engine_version("CompatibleWithEngineVersion")?;
        } else {
            self.summary.compatible_with_engine_version =
                self.summary.saved_by_engine_version.clone();
        }

        self.summary.compression_flags = self.cur.u32("CompressionFlags")?;

        let count = self.cur.i32("CompressedChunks Count")?;
        if count > 0 {
            return Err(DecodeError::CompressedUnsupported);
        }

        self.summary.package_source = self.cur.u32("PackageSource")?;

        let count = self.cur.u32("AdditionalPackagesToCook Count")?;
        if count > 0 {
            return Err(DecodeError::AdditionalPackagesUnsupported);
        }

        if self.summary.legacy_file_version > LEGACY_VERSION_REMOVED_TEXTURE_ALLOCATIONS {
            self.summary.num_texture_allocations = Some(self.cur.i32("NumTextureAllocations")?);
        }

        self.summary.asset_registry_data_offset = self.cur.i32("AssetRegistryDataOffset")?;
        self.summary.bulk_data_start_offset = self.cur.i64("BulkDataStartOffset")?;

        if gate.ue4_at_least(ue4::WORLD_LEVEL_INFO) {
            self.summary.world_tile_info_data_offset =
                Some(self.cur.i32("WorldTileInfoDataOffset")?);
        }

        if gate.ue4_at_least(ue4::CHANGED_CHUNKID_TO_BE_AN_ARRAY_OF_CHUNKIDS) {
            let count = self.cur.i32("ChunkIDs Count")?;
            if count > 0 {
                return Err(DecodeError::ChunkIdArrayUnsupported);
            }
        } else if gate.ue4_at_least(ue4::ADDED_CHUNKID_TO_ASSETDATA_AND_UPACKAGE) {
            self.summary.chunk_id = Some(self.cur.i32("ChunkID")?);
        }

        if gate.ue4_at_least(ue4::PRELOAD_DEPENDENCIES_IN_COOKED_EXPORTS) {
            self.summary.preload_dependency_count = self.cur.i32("PreloadDependencyCount")?;
            self.summary.preload_dependency_offset = self.cur.i32("PreloadDependencyOffset")?;
        } else {
            self.summary.preload_dependency_count = -1;
            self.summary.preload_dependency_offset = 0;
        }

        if gate.ue5_at_least(ue5::NAMES_REFERENCED_FROM_EXPORT_DATA) {
            self.summary.names_referenced_from_export_data_count =
                Some(self.cur.i32("NamesReferencedFromExportDataCount")?);
        }

        if gate.ue5_at_least(ue5::PAYLOAD_TOC) {
            self.summary.payload_toc_offset = self.cur.i64("PayloadTocOffset")?;
        } else {
            self.summary.payload_toc_offset = -1;
        }

        if gate.ue5_at_least(ue5::DATA_RESOURCES) {
            self.summary.data_resource_offset = Some(self.cur.i32("DataResourceOffset")?);
        }

        Ok(())
    }

    /// `major.minor.patch-changelist+branch`, serialized as three uint16s,
    /// a uint32 and an fstring.
    fn read_engine_version(&mut self, key: &str) -> Result<String, DecodeError> {
        let major = self.cur.u16(&format!("{key} Major"))?;
        let minor = self.cur.u16(&format!("{key} Minor"))?;
        let patch = self.cur.u16(&format!("{key} Patch"))?;
        let changelist = self.cur.u32(&format!("{key} Changelist"))?;
        let branch = self.cur.fstring(&format!("{key} Branch"))?;
        Ok(format!("{major}.{minor}.{patch}-{changelist}+{branch}"))
    }
}
