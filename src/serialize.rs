use std::collections::HashMap;

use crate::domain::{CreatedSample, FilePathMapping, MsDataRegistration, SchemaVariant, columns};
use crate::error::IngestError;
use crate::schema::ValidatedPlateMap;
use crate::table::PlateMapTable;

/// Optional per-file attributes copied from the plate map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    WellLocation,
    Nanoparticle,
    NanoparticleId,
    Control,
    ControlId,
    InstrumentName,
    DateSamplePrep,
    SampleVolume,
    PeptideConcentration,
    PeptideMassSample,
    ReconVolume,
    DilutionFactor,
    KitId,
    AssayVersion,
    SampleTubeId,
    MethodSetId,
    AssayMethodId,
}

impl TrackedField {
    /// Column names consulted in order; the first present, non-empty cell wins.
    pub fn aliases(self, variant: SchemaVariant) -> &'static [&'static str] {
        use SchemaVariant::{Current, Legacy};
        use TrackedField::*;
        match (self, variant) {
            (WellLocation, _) => &["Well location"],
            (Nanoparticle, Legacy) => &["Nanoparticle"],
            (Nanoparticle, Current) => &["Nanoparticle set", "Nanoparticle"],
            (NanoparticleId, Legacy) => &["Nanoparticle ID"],
            (NanoparticleId, Current) => &["Nanoparticle set ID", "Nanoparticle ID"],
            (Control, _) => &["Control"],
            (ControlId, _) => &["Control ID"],
            (InstrumentName, Legacy) => &["Instrument name"],
            (InstrumentName, Current) => &["Instrument ID", "Instrument name"],
            (DateSamplePrep, Legacy) => &["Date sample preparation"],
            (DateSamplePrep, Current) => &["Date assay initiated", "Date sample preparation"],
            (SampleVolume, _) => &["Sample volume"],
            (PeptideConcentration, Legacy) => &["Peptide concentration"],
            (PeptideConcentration, Current) => {
                &["Reconstituted peptide concentration", "Peptide concentration"]
            }
            (PeptideMassSample, Legacy) => &["Peptide mass sample"],
            (PeptideMassSample, Current) => &["Recovered peptide mass", "Peptide mass sample"],
            (ReconVolume, Legacy) => &["Recon volume"],
            (ReconVolume, Current) => &["Reconstitution volume", "Recon volume"],
            (DilutionFactor, _) => &["Dilution factor"],
            (KitId, _) => &["Kit ID"],
            (AssayVersion, Legacy) => &["Assay"],
            (AssayVersion, Current) => &["Assay product", "Assay"],
            (SampleTubeId, _) => &["Sample tube ID"],
            (MethodSetId, _) => &["Method set ID"],
            (AssayMethodId, _) => &["Assay method ID"],
        }
    }

    /// Resolved value for one row, `""` when no alias has a value.
    pub fn resolve(self, table: &PlateMapTable, row: usize, variant: SchemaVariant) -> String {
        self.aliases(variant)
            .iter()
            .find_map(|column| table.text(row, column))
            .unwrap_or_default()
    }
}

/// Joins plate-map rows with created samples and storage paths, one record per row.
pub fn serialize(
    plate_map: &ValidatedPlateMap,
    created_samples: &[CreatedSample],
    file_paths: &FilePathMapping,
    space: Option<&str>,
) -> Result<Vec<MsDataRegistration>, IngestError> {
    let table = plate_map.table();
    let variant = plate_map.variant();
    let durable_ids = created_samples
        .iter()
        .map(|sample| (sample.sample_id.as_str(), sample.id.as_str()))
        .collect::<HashMap<_, _>>();

    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let sample_id = table.text(row, columns::SAMPLE_ID).unwrap_or_default();
        let durable_id = durable_ids
            .get(sample_id.as_str())
            .ok_or_else(|| IngestError::UnknownSampleId(sample_id.clone()))?;
        let file_name = table.text(row, columns::MS_FILE_NAME).unwrap_or_default();
        let raw_file_path = file_paths
            .get(&file_name)
            .ok_or_else(|| IngestError::UnresolvedFilePath(file_name.clone()))?;

        let field = |tracked: TrackedField| tracked.resolve(table, row, variant);
        records.push(MsDataRegistration {
            sample_id: durable_id.to_string(),
            sample_id_tracking: sample_id.clone(),
            well_location: field(TrackedField::WellLocation),
            nanoparticle: field(TrackedField::Nanoparticle),
            nanoparticle_id: field(TrackedField::NanoparticleId),
            control: field(TrackedField::Control),
            control_id: field(TrackedField::ControlId),
            instrument_name: field(TrackedField::InstrumentName),
            date_sample_prep: field(TrackedField::DateSamplePrep),
            sample_volume: field(TrackedField::SampleVolume),
            peptide_concentration: field(TrackedField::PeptideConcentration),
            peptide_mass_sample: field(TrackedField::PeptideMassSample),
            recon_volume: field(TrackedField::ReconVolume),
            dilution_factor: field(TrackedField::DilutionFactor),
            kit_id: field(TrackedField::KitId),
            assay_version: field(TrackedField::AssayVersion),
            sample_tube_id: field(TrackedField::SampleTubeId),
            method_set_id: field(TrackedField::MethodSetId),
            assay_method_id: field(TrackedField::AssayMethodId),
            space: space.map(str::to_string),
            raw_file_path: raw_file_path.to_string(),
        });
    }
    Ok(records)
}
