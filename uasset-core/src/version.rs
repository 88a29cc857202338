//! Package magic and serialization version constants.
//!
//! Only the versions the decoder actually gates on are listed. The values
//! are load-bearing: every optional header field shifts all later offsets,
//! so a wrong threshold breaks the whole linear pass.

/// Leading tag of every package file, in the byte order it was saved with.
pub const PACKAGE_FILE_TAG: u32 = 0x9E2A83C1;
/// The tag as seen when the package was saved with the opposite endianness.
/// Hitting this flips every subsequent fixed-width read to big-endian.
pub const PACKAGE_FILE_TAG_SWAPPED: u32 = 0xC183_2A9E;

/// Supported legacy (negative) file versions. These select the header shape
/// generation; anything else is rejected.
///
/// -6/-7 carry only the UE4 counter, -8 adds the UE5 counter.
pub const SUPPORTED_LEGACY_FILE_VERSIONS: [i32; 3] = [-6, -7, -8];

/// Legacy file version at which the UE5 counter joins the summary.
pub const LEGACY_VERSION_WITH_UE5: i32 = -8;

/// Legacy file versions newer than this still carry texture allocation info.
pub const LEGACY_VERSION_REMOVED_TEXTURE_ALLOCATIONS: i32 = -7;

/// UE4 object version thresholds (`FileVersionUE4` gates).
pub mod ue4 {
    /// Oldest package the engine can still load.
    pub const OLDEST_LOADABLE_PACKAGE: i32 = 214;
    /// Level info used by the world browser, adds WorldTileInfoDataOffset.
    pub const WORLD_LEVEL_INFO: i32 = 224;
    /// Streaming install ChunkID on AssetData/UPackage.
    pub const ADDED_CHUNKID_TO_ASSETDATA_AND_UPACKAGE: i32 = 278;
    /// ChunkID became an array of IDs.
    pub const CHANGED_CHUNKID_TO_BE_AN_ARRAY_OF_CHUNKIDS: i32 = 326;
    /// Engine version stored as a structured record instead of a changelist.
    pub const ENGINE_VERSION_OBJECT: i32 = 336;
    /// NeedsLoadForEditorGame flag on exports.
    pub const LOAD_FOR_EDITOR_GAME: i32 = 365;
    /// StringAssetReferencesMap, adds the soft package reference table.
    pub const ADD_STRING_ASSET_REFERENCES_MAP: i32 = 384;
    /// Separate CompatibleWithEngineVersion record in the summary.
    pub const PACKAGE_SUMMARY_HAS_COMPATIBLE_ENGINE_VERSION: i32 = 444;
    /// Pre-gathered localizable text tables.
    pub const SERIALIZE_TEXT_IN_PACKAGES: i32 = 459;
    /// bIsAsset flag on exports.
    pub const COOKED_ASSETS_IN_EDITOR_SUPPORT: i32 = 485;
    /// Event-driven-loader dependency graph in cooked exports.
    pub const PRELOAD_DEPENDENCIES_IN_COOKED_EXPORTS: i32 = 507;
    /// TemplateIndex in cooked exports.
    pub const TEMPLATEINDEX_IN_COOKED_EXPORTS: i32 = 508;
    /// SearchableNames in summary and asset registry.
    pub const ADDED_SEARCHABLE_NAMES: i32 = 510;
    /// LocalizationId in the summary.
    pub const ADDED_PACKAGE_SUMMARY_LOCALIZATION_ID: i32 = 516;
    /// Package owner for private references, adds PersistentGuid.
    pub const ADDED_PACKAGE_OWNER: i32 = 518;
    /// Imports may live in a package other than their outer.
    pub const NON_OUTER_PACKAGE_IMPORT: i32 = 520;
}

/// UE5 object version thresholds (`FileVersionUE5` gates).
pub mod ue5 {
    /// Stripping of names not referenced from export data.
    pub const NAMES_REFERENCED_FROM_EXPORT_DATA: i32 = 1001;
    /// Payload table of contents in the summary.
    pub const PAYLOAD_TOC: i32 = 1002;
    /// References from/to optional packages.
    pub const OPTIONAL_RESOURCES: i32 = 1003;
    /// Soft object path list in the summary.
    pub const ADD_SOFTOBJECTPATH_LIST: i32 = 1008;
    /// Bulk/data resource table.
    pub const DATA_RESOURCES: i32 = 1009;
}

/// The two forward version counters read from the summary, plus the legacy
/// generation selector. Every optional field elsewhere is gated on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGate {
    pub legacy_file_version: i32,
    pub file_version_ue4: i32,
    /// Only serialized for third-generation (-8) headers.
    pub file_version_ue5: Option<i32>,
}

impl VersionGate {
    #[inline]
    pub fn ue4_at_least(&self, version: i32) -> bool {
        self.file_version_ue4 >= version
    }

    #[inline]
    pub fn ue4_before(&self, version: i32) -> bool {
        self.file_version_ue4 < version
    }

    /// An absent UE5 counter never satisfies any UE5 gate.
    #[inline]
    pub fn ue5_at_least(&self, version: i32) -> bool {
        self.file_version_ue5.unwrap_or(0) >= version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_constants_are_byte_swaps_of_each_other() {
        assert_eq!(PACKAGE_FILE_TAG.swap_bytes(), PACKAGE_FILE_TAG_SWAPPED);
    }

    #[test]
    fn absent_ue5_counter_fails_every_ue5_gate() {
        let gate = VersionGate {
            legacy_file_version: -7,
            file_version_ue4: 522,
            file_version_ue5: None,
        };
        assert!(!gate.ue5_at_least(ue5::NAMES_REFERENCED_FROM_EXPORT_DATA));
        assert!(gate.ue4_at_least(ue4::NON_OUTER_PACKAGE_IMPORT));
        assert!(!gate.ue4_before(ue4::OLDEST_LOADABLE_PACKAGE));
    }

    #[test]
    fn present_ue5_counter_gates_in_order() {
        let gate = VersionGate {
            legacy_file_version: -8,
            file_version_ue4: 522,
            file_version_ue5: Some(1002),
        };
        assert!(gate.ue5_at_least(ue5::PAYLOAD_TOC));
        assert!(!gate.ue5_at_least(ue5::OPTIONAL_RESOURCES));
    }
}
