//! Table section decoders. Each seeks to an offset recorded in the summary
//! and decodes one section; the orchestrator in `decoder.rs` fixes the order.

use crate::decoder::PackageDecoder;
use crate::document::{
    AssetRegistryEntry, AssetTag, ExportDataProbe, ExportEntry, GatherableTextData, ImageFormat,
    ImportEntry, MetadataBlock, NameEntry, SoftPackageReference, SourceData, SourceSiteContext,
    Thumbnail, ThumbnailIndexEntry,
};
use crate::error::DecodeError;
use crate::version::{ue4, ue5};

impl PackageDecoder {
    /// NameCount `{fstring, hash, hash}` records from NameOffset. The order
    /// of this table is the index space every other section resolves
    /// against.
    pub(crate) fn read_names(&mut self) -> Result<(), DecodeError> {
        self.cur.seek(self.summary.name_offset as i64);
        for idx in 1..=self.summary.name_count {
            let name = self.cur.fstring(&format!("Name #{idx}: string"))?;
            let non_case_preserving_hash = self
                .cur
                .u16(&format!("Name #{idx}: NonCasePreservingHash"))?;
            let case_preserving_hash =
                self.cur.u16(&format!("Name #{idx}: CasePreservingHash"))?;
            self.names.push(NameEntry {
                name,
                non_case_preserving_hash,
                case_preserving_hash,
            });
        }
        Ok(())
    }

    /// Localizable text gathered at cook time. Metadata blocks are only
    /// decodable when empty; the value encoding is unknown upstream and a
    /// nonzero count fails the decode rather than guessing a format.
    pub(crate) fn read_gatherable_text_data(&mut self) -> Result<(), DecodeError> {
        let count = self.summary.gatherable_text_data_count.unwrap_or(0);
        self.cur
            .seek(self.summary.gatherable_text_data_offset.unwrap_or(0) as i64);

        for idx in 1..=count {
            let namespace_name =
                self.cur.fstring(&format!("GatherableTextData #{idx}: NamespaceName"))?;

            let source_string = self
                .cur
                .fstring(&format!("GatherableTextData #{idx}: SourceData.SourceString"))?;
            let source_string_meta_data = self.read_metadata_block(
                &format!("GatherableTextData #{idx}: SourceData.CountSourceStringMetaData"),
                "SourceStringMetaData",
            )?;

            let mut source_site_contexts = Vec::new();
            let context_count = self
                .cur
                .i32(&format!("GatherableTextData #{idx}: CountSourceSiteContexts"))?;
            for ctx in 1..=context_count {
                let prefix = format!("GatherableTextData #{idx} - SourceSiteContexts #{ctx}");
                let key_name = self.cur.fstring(&format!("{prefix}: KeyName"))?;
                let site_description = self.cur.fstring(&format!("{prefix}: SiteDescription"))?;
                let is_editor_only = self.cur.u32(&format!("{prefix}: IsEditorOnly"))?;
                let is_optional = self.cur.u32(&format!("{prefix}: IsOptional"))?;
                let info_meta_data = self.read_metadata_block(
                    &format!("{prefix}: CountInfoMetaData"),
                    "SourceSiteContexts.InfoMetaData",
                )?;
                let key_meta_data = self.read_metadata_block(
                    &format!("{prefix}: CountKeyMetaData"),
                    "SourceSiteContexts.KeyMetaData",
                )?;
                source_site_contexts.push(SourceSiteContext {
                    key_name,
                    site_description,
                    is_editor_only,
                    is_optional,
                    info_meta_data,
                    key_meta_data,
                });
            }

            self.gatherable_text_data.push(GatherableTextData {
                namespace_name,
                source_data: SourceData {
                    source_string,
                    source_string_meta_data,
                },
                source_site_contexts,
            });
        }
        Ok(())
    }

    fn read_metadata_block(
        &mut self,
        key: &str,
        context: &'static str,
    ) -> Result<MetadataBlock, DecodeError> {
        let value_count = self.cur.i32(key)?;
        if value_count > 0 {
            return Err(DecodeError::UnsupportedMetadataBlock { context });
        }
        Ok(MetadataBlock { value_count })
    }

    /// Import map: all name indices resolve to strings immediately. Files
    /// older than version 520 never serialize `packageName`; the reference
    /// reader then resolves index 0 like any other index, and that edge case
    /// is reproduced as-is.
    pub(crate) fn read_imports(&mut self) -> Result<(), DecodeError> {
        self.cur.seek(self.summary.import_offset as i64);
        let gate = self.gate();

        for idx in 1..=self.summary.import_count {
            let class_package = self.cur.u64(&format!("Import #{idx}: classPackage"))?;
            let class_name = self.cur.u64(&format!("Import #{idx}: className"))?;
            let outer_index = self.cur.i32(&format!("Import #{idx}: outerIndex"))?;
            let object_name = self.cur.u64(&format!("Import #{idx}: objectName"))?;

            let mut package_name = 0u64;
            if gate.ue4_at_least(ue4::NON_OUTER_PACKAGE_IMPORT) {
                package_name = self.cur.u64(&format!("Import #{idx}: packageName"))?;
            }

            let mut import_optional = 0i32;
            if gate.ue5_at_least(ue5::OPTIONAL_RESOURCES) {
                import_optional = self.cur.i32(&format!("Import #{idx}: importOptional"))?;
            }

            self.imports.push(ImportEntry {
                class_package: self.names.resolve(class_package).to_string(),
                class_name: self.names.resolve(class_name).to_string(),
                outer_index,
                object_name: self.names.resolve(object_name).to_string(),
                package_name: self.names.resolve(package_name).to_string(),
                import_optional,
            });
        }
        Ok(())
    }

    /// Export map, two passes: the flat metadata records first, then a
    /// best-effort probe at each export's payload offset. The probe is a
    /// 2-field placeholder, not a property decoder; the payload format is
    /// unresolved upstream.
    pub(crate) fn read_exports(&mut self) -> Result<(), DecodeError> {
        self.cur.seek(self.summary.export_offset as i64);
        let gate = self.gate();

        for idx in 1..=self.summary.export_count {
            let class_index = self.cur.i32(&format!("Export #{idx}: classIndex"))?;
            let super_index = self.cur.i32(&format!("Export #{idx}: superIndex"))?;

            let mut template_index = 0i32;
            if gate.ue4_at_least(ue4::TEMPLATEINDEX_IN_COOKED_EXPORTS) {
                template_index = self.cur.i32(&format!("Export #{idx}: templateIndex"))?;
            }

            let outer_index = self.cur.i32(&format!("Export #{idx}: outerIndex"))?;
            let object_name = self.cur.u64(&format!("Export #{idx}: objectName"))?;
            let object_flags = self.cur.u32(&format!("Export #{idx}: objectFlags"))?;
            let serial_size = self.cur.i64(&format!("Export #{idx}: serialSize"))?;
            let serial_offset = self.cur.i64(&format!("Export #{idx}: serialOffset"))?;
            let forced_export = self.cur.i32(&format!("Export #{idx}: bForcedExport"))?;
            let not_for_client = self.cur.i32(&format!("Export #{idx}: bNotForClient"))?;
            let not_for_server = self.cur.i32(&format!("Export #{idx}: bNotForServer"))?;
            let package_guid = self.cur.guid_plain(&format!("Export #{idx}: packageGuid"))?;
            let package_flags = self.cur.u32(&format!("Export #{idx}: packageFlags"))?;

            let mut not_always_loaded_for_editor_game = 0i32;
            if gate.ue4_at_least(ue4::LOAD_FOR_EDITOR_GAME) {
                not_always_loaded_for_editor_game = self
                    .cur
                    .i32(&format!("Export #{idx}: bNotAlwaysLoadedForEditorGame"))?;
            }

            let mut is_asset = 0i32;
            if gate.ue4_at_least(ue4::COOKED_ASSETS_IN_EDITOR_SUPPORT) {
                is_asset = self.cur.i32(&format!("Export #{idx}: bIsAsset"))?;
            }

            let mut generate_public_hash = 0i32;
            if gate.ue5_at_least(ue5::OPTIONAL_RESOURCES) {
                generate_public_hash =
                    self.cur.i32(&format!("Export #{idx}: bGeneratePublicHash"))?;
            }

            let mut first_export_dependency = 0i32;
            let mut serialization_before_serialization_dependencies = 0i32;
            let mut create_before_serialization_dependencies = 0i32;
            let mut serialization_before_create_dependencies = 0i32;
            let mut create_before_create_dependencies = 0i32;
            if gate.ue4_at_least(ue4::PRELOAD_DEPENDENCIES_IN_COOKED_EXPORTS) {
                first_export_dependency =
                    self.cur.i32(&format!("Export #{idx}: firstExportDependency"))?;
                serialization_before_serialization_dependencies = self.cur.i32(&format!(
                    "Export #{idx}: serializationBeforeSerializationDependencies"
                ))?;
                create_before_serialization_dependencies = self.cur.i32(&format!(
                    "Export #{idx}: createBeforeSerializationDependencies"
                ))?;
                serialization_before_create_dependencies = self.cur.i32(&format!(
                    "Export #{idx}: serializationBeforeCreateDependencies"
                ))?;
                create_before_create_dependencies = self
                    .cur
                    .i32(&format!("Export #{idx}: createBeforeCreateDependencies"))?;
            }

            self.exports.push(ExportEntry {
                class_index,
                super_index,
                template_index,
                outer_index,
                object_name: self.names.resolve(object_name).to_string(),
                object_flags,
                serial_size,
                serial_offset,
                forced_export,
                not_for_client,
                not_for_server,
                package_guid,
                package_flags,
                not_always_loaded_for_editor_game,
                is_asset,
                generate_public_hash,
                first_export_dependency,
                serialization_before_serialization_dependencies,
                create_before_serialization_dependencies,
                serialization_before_create_dependencies,
                create_before_create_dependencies,
                data: None,
            });
        }

        // second pass: probe the payload of every export that claims bytes
        for idx in 0..self.exports.len() {
            if self.exports[idx].serial_size <= 0 {
                continue;
            }
            self.cur.seek(self.exports[idx].serial_offset);

            let name_index = self.cur.u64(&format!("Exports #{}: data", idx + 1))?;
            let flags = self.cur.u32("flags")?;
            self.exports[idx].data = Some(ExportDataProbe {
                object_name: self.names.resolve(name_index).to_string(),
                flags,
            });
        }
        Ok(())
    }

    /// Count-prefixed raw package indices.
    pub(crate) fn read_depends(&mut self) -> Result<(), DecodeError> {
        self.cur.seek(self.summary.depends_offset as i64);
        let count = self.cur.i32("Depends Count")?;
        for idx in 1..=count {
            self.depends
                .push(self.cur.i32(&format!("Depend #{idx}: FPackageIndex"))?);
        }
        Ok(())
    }

    /// Count taken from the summary, entries are name indices.
    pub(crate) fn read_soft_package_references(&mut self) -> Result<(), DecodeError> {
        self.cur
            .seek(self.summary.soft_package_references_offset.unwrap_or(0) as i64);
        let count = self.summary.soft_package_references_count.unwrap_or(0);
        for idx in 1..=count {
            let name_index = self
                .cur
                .u64(&format!("SoftPackageReferences #{idx}: SoftPackageReferences"))?;
            self.soft_package_references.push(SoftPackageReference {
                asset_path_name: self.names.resolve(name_index).to_string(),
            });
        }
        Ok(())
    }

    /// Only the leading count is consumed; the section contents are
    /// unimplemented upstream. Skipped entirely on files that predate the
    /// summary field.
    pub(crate) fn read_searchable_names(&mut self) -> Result<(), DecodeError> {
        let Some(offset) = self.summary.searchable_names_offset else {
            return Ok(());
        };
        self.cur.seek(offset as i64);
        self.cur.i32("CountSearchableNames")?;
        Ok(())
    }

    /// Thumbnail table, two passes: the index entries first, then each image
    /// blob at its recorded file offset. Negative stored height means JPEG.
    pub(crate) fn read_thumbnails(&mut self) -> Result<(), DecodeError> {
        self.cur.seek(self.summary.thumbnail_table_offset as i64);

        let count = self.cur.i32("Thumbnails Count")?;
        for idx in 1..=count {
            let asset_class_name =
                self.cur.fstring(&format!("Thumbnails #{idx}: assetClassName"))?;
            let object_path_without_package_name = self
                .cur
                .fstring(&format!("Thumbnails #{idx}: objectPathWithoutPackageName"))?;
            let file_offset = self.cur.i32(&format!("Thumbnails #{idx}: fileOffset"))?;
            self.thumbnails.index.push(ThumbnailIndexEntry {
                asset_class_name,
                object_path_without_package_name,
                file_offset,
            });
        }

        for idx in 0..self.thumbnails.index.len() {
            self.cur.seek(self.thumbnails.index[idx].file_offset as i64);
            let key = idx + 1;

            let image_width = self.cur.i32(&format!("Thumbnails #{key}: imageWidth"))?;
            let stored_height = self.cur.i32(&format!("Thumbnails #{key}: imageHeight"))?;
            let image_format = if stored_height < 0 {
                ImageFormat::Jpeg
            } else {
                ImageFormat::Png
            };
            // unsigned_abs: unary negation of i32::MIN would overflow
            let image_height = stored_height.unsigned_abs();

            let image_size_data = self.cur.i32(&format!("Thumbnails #{key}: imageSizeData"))?;
            let mut image_data = Vec::new();
            if image_size_data > 0 {
                let start = self.cur.position();
                image_data = self.cur.take(image_size_data as usize)?;
                let mut dump = String::with_capacity(image_data.len() * 2);
                for byte in &image_data {
                    dump.push_str(&format!("{:02x}", byte));
                }
                self.cur.record_raw(
                    &format!("Thumbnails #{key}: imageData"),
                    "data",
                    dump,
                    start,
                    self.cur.position() - 1,
                );
            }

            self.thumbnails.thumbnails.push(Thumbnail {
                image_width,
                image_height,
                image_format,
                image_size_data,
                image_data,
            });
        }
        Ok(())
    }

    /// Asset registry tag block. The section byte-length is informational:
    /// the distance to the next known boundary in the file.
    pub(crate) fn read_asset_registry_data(&mut self) -> Result<(), DecodeError> {
        self.cur.seek(self.summary.asset_registry_data_offset as i64);

        let next_offset = match self.summary.world_tile_info_data_offset {
            Some(offset) if offset > 0 => offset,
            _ => self.summary.total_header_size,
        };
        self.asset_registry.size =
            i64::from(next_offset) - i64::from(self.summary.asset_registry_data_offset);

        self.asset_registry.dependency_data_offset = self.cur.i64("DependencyDataOffset")?;

        let count = self.cur.i32("AssetRegistryData Count")?;
        for _ in 0..count {
            let object_path = self.cur.fstring("ObjectPath")?;
            let object_class_name = self.cur.fstring("ObjectClassName")?;

            let mut tags = Vec::new();
            let tag_count = self.cur.i32("AssetRegistryData Tag Count")?;
            for _ in 0..tag_count {
                let key = self.cur.fstring("key")?;
                let value = self.cur.fstring("value")?;
                tags.push(AssetTag { key, value });
            }

            self.asset_registry.entries.push(AssetRegistryEntry {
                object_path,
                object_class_name,
                tags,
            });
        }
        Ok(())
    }

    /// Cursor reposition only; the dependency array itself is preload data
    /// for the event-driven loader and carries no table to decode here.
    pub(crate) fn read_preload_dependency(&mut self) {
        self.cur.seek(self.summary.preload_dependency_offset as i64);
    }

    /// Cursor reposition only; bulk data lives past the header.
    pub(crate) fn read_bulk_data_start(&mut self) {
        self.cur.seek(self.summary.bulk_data_start_offset);
    }
}
