//! The fully-typed in-memory document a successful decode produces.
//!
//! Everything here is a flat record: entities reference the name table only
//! by integer index, resolved once at decode time into literal strings.

use serde::Serialize;

use crate::audit::AuditEntry;

/// One interned name. The order of entries is the canonical index space.
/// The two hashes are legacy artifacts, recalculated by the engine on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameEntry {
    pub name: String,
    pub non_case_preserving_hash: u16,
    pub case_preserving_hash: u16,
}

/// Ordered interned strings; every other table references names by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NameTable {
    entries: Vec<NameEntry>,
}

impl NameTable {
    pub fn push(&mut self, entry: NameEntry) {
        self.entries.push(entry);
    }

    /// Resolve an index to its literal string. Out-of-range indices resolve
    /// to the empty string; this never fails. On-disk name references are
    /// serialized as 64-bit values, so the index type follows.
    pub fn resolve(&self, index: u64) -> &str {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .map_or("", |entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NameEntry] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomVersion {
    pub key: String,
    pub version: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub export_count: i32,
    pub name_count: i32,
}

/// The package summary: the leading fixed-plus-conditional header section.
/// `None` means the field is not serialized at this file version at all,
/// which is different from a zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageSummary {
    pub package_file_tag: u32,
    pub legacy_file_version: i32,
    pub legacy_ue3_version: i32,
    pub file_version_ue4: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_version_ue5: Option<i32>,
    pub file_version_licensee_ue4: i32,
    pub custom_versions: Vec<CustomVersion>,
    pub total_header_size: i32,
    pub folder_name: String,
    pub package_flags: u32,
    pub name_count: i32,
    pub name_offset: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_object_paths_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_object_paths_offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gatherable_text_data_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gatherable_text_data_offset: Option<i32>,
    pub export_count: i32,
    pub export_offset: i32,
    pub import_count: i32,
    pub import_offset: i32,
    pub depends_offset: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_package_references_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_package_references_offset: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable_names_offset: Option<i32>,
    pub thumbnail_table_offset: i32,
    pub guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_persistent_guid: Option<String>,
    pub generations: Vec<Generation>,
    /// `major.minor.patch-changelist+branch` from version 336 on, otherwise
    /// the bare changelist lands in `engine_changelist`.
    pub saved_by_engine_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_changelist: Option<i32>,
    /// Copies `saved_by_engine_version` before version 444.
    pub compatible_with_engine_version: String,
    pub compression_flags: u32,
    pub package_source: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_texture_allocations: Option<i32>,
    pub asset_registry_data_offset: i32,
    pub bulk_data_start_offset: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_tile_info_data_offset: Option<i32>,
    /// Always empty: a nonzero chunk-id count fails the decode.
    pub chunk_ids: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<i32>,
    /// -1 / 0 sentinels when the fields are absent at this version.
    pub preload_dependency_count: i32,
    pub preload_dependency_offset: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names_referenced_from_export_data_count: Option<i32>,
    /// -1 sentinel when absent.
    pub payload_toc_offset: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_resource_offset: Option<i32>,
}

/// `{valueCount, values[]}` block. Only an empty block is decodable; the
/// value encoding was never resolved upstream and a nonzero count fails the
/// whole decode rather than guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataBlock {
    pub value_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceData {
    pub source_string: String,
    pub source_string_meta_data: MetadataBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSiteContext {
    pub key_name: String,
    pub site_description: String,
    pub is_editor_only: u32,
    pub is_optional: u32,
    pub info_meta_data: MetadataBlock,
    pub key_meta_data: MetadataBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatherableTextData {
    pub namespace_name: String,
    pub source_data: SourceData,
    pub source_site_contexts: Vec<SourceSiteContext>,
}

/// Metadata for an object referenced from outside the package. All name
/// indices are resolved to strings at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEntry {
    pub class_package: String,
    pub class_name: String,
    pub outer_index: i32,
    pub object_name: String,
    /// Serialized from version 520 on; older files resolve index 0 here.
    pub package_name: String,
    pub import_optional: i32,
}

/// The 2-field probe read at an export's payload offset. This is not a real
/// property decoder; the payload format is unresolved upstream and the probe
/// is reproduced as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDataProbe {
    pub object_name: String,
    pub flags: u32,
}

/// Metadata for an object defined in this package. class/super/template/
/// outer are raw package indices (not name indices) and stay unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub class_index: i32,
    pub super_index: i32,
    pub template_index: i32,
    pub outer_index: i32,
    pub object_name: String,
    pub object_flags: u32,
    pub serial_size: i64,
    pub serial_offset: i64,
    pub forced_export: i32,
    pub not_for_client: i32,
    pub not_for_server: i32,
    pub package_guid: String,
    pub package_flags: u32,
    pub not_always_loaded_for_editor_game: i32,
    pub is_asset: i32,
    pub generate_public_hash: i32,
    pub first_export_dependency: i32,
    pub serialization_before_serialization_dependencies: i32,
    pub create_before_serialization_dependencies: i32,
    pub serialization_before_create_dependencies: i32,
    pub create_before_create_dependencies: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExportDataProbe>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftPackageReference {
    pub asset_path_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailIndexEntry {
    pub asset_class_name: String,
    pub object_path_without_package_name: String,
    pub file_offset: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thumbnail {
    pub image_width: i32,
    /// Stored negative for JPEG; always the absolute value here, unsigned
    /// so the full `i32` range of stored heights stays representable.
    pub image_height: u32,
    pub image_format: ImageFormat,
    pub image_size_data: i32,
    pub image_data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Thumbnails {
    pub index: Vec<ThumbnailIndexEntry>,
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRegistryEntry {
    pub object_path: String,
    pub object_class_name: String,
    pub tags: Vec<AssetTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetRegistryData {
    /// Informational byte length of the section: distance to the next known
    /// boundary (world tile info if present, else the end of the header).
    /// Widened so the difference of two arbitrary `i32` offsets always fits.
    pub size: i64,
    pub dependency_data_offset: i64,
    pub entries: Vec<AssetRegistryEntry>,
}

/// The root of a successful decode. Created fresh per call and immutable
/// once returned; two concurrent decodes share nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageDocument {
    pub summary: PackageSummary,
    pub names: NameTable,
    pub gatherable_text_data: Vec<GatherableTextData>,
    pub imports: Vec<ImportEntry>,
    pub exports: Vec<ExportEntry>,
    /// Raw package indices from the depends table.
    pub depends: Vec<i32>,
    pub soft_package_references: Vec<SoftPackageReference>,
    /// Only the leading count of the section is consumed; the contents are
    /// unimplemented upstream, so this stays empty.
    pub searchable_names: Vec<String>,
    pub thumbnails: Thumbnails,
    pub asset_registry: AssetRegistryData,
    /// Populated only in audit mode, sorted ascending by start offset.
    pub audit_trail: Vec<AuditEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_out_of_range_is_empty_and_total() {
        let mut names = NameTable::default();
        names.push(NameEntry {
            name: "Package".into(),
            non_case_preserving_hash: 0,
            case_preserving_hash: 0,
        });
        assert_eq!(names.resolve(0), "Package");
        assert_eq!(names.resolve(1), "");
        assert_eq!(names.resolve(u64::MAX), "");
    }
}
