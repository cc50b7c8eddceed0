use std::fs::File;
use std::path::Path;

use crate::domain::SchemaVariant;
use crate::error::IngestError;
use crate::table::{Cell, PlateMapTable};

/// Attributes an in-memory plate map can carry, in output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateMapAttribute {
    MsFileName,
    SampleName,
    SampleId,
    WellLocation,
    Nanoparticle,
    NanoparticleId,
    Control,
    ControlId,
    InstrumentName,
    DateSamplePreparation,
    SampleVolume,
    PeptideConcentration,
    PeptideMassSample,
    ReconVolume,
    DilutionFactor,
    KitId,
    PlateId,
    PlateName,
    AssayVersion,
    SampleTubeId,
    MethodSetId,
    AssayMethodId,
}

impl PlateMapAttribute {
    pub const ALL: [PlateMapAttribute; 22] = [
        PlateMapAttribute::MsFileName,
        PlateMapAttribute::SampleName,
        PlateMapAttribute::SampleId,
        PlateMapAttribute::WellLocation,
        PlateMapAttribute::Nanoparticle,
        PlateMapAttribute::NanoparticleId,
        PlateMapAttribute::Control,
        PlateMapAttribute::ControlId,
        PlateMapAttribute::InstrumentName,
        PlateMapAttribute::DateSamplePreparation,
        PlateMapAttribute::SampleVolume,
        PlateMapAttribute::PeptideConcentration,
        PlateMapAttribute::PeptideMassSample,
        PlateMapAttribute::ReconVolume,
        PlateMapAttribute::DilutionFactor,
        PlateMapAttribute::KitId,
        PlateMapAttribute::PlateId,
        PlateMapAttribute::PlateName,
        PlateMapAttribute::AssayVersion,
        PlateMapAttribute::SampleTubeId,
        PlateMapAttribute::MethodSetId,
        PlateMapAttribute::AssayMethodId,
    ];

    /// Header written for this attribute, or `None` when the variant has no such column.
    pub fn header(self, variant: SchemaVariant) -> Option<&'static str> {
        use PlateMapAttribute::*;
        match (variant, self) {
            (_, MsFileName) => Some("MS file name"),
            (_, SampleName) => Some("Sample name"),
            (_, SampleId) => Some("Sample ID"),
            (_, WellLocation) => Some("Well location"),
            (_, ControlId) => Some("Control ID"),
            (_, SampleVolume) => Some("Sample volume"),
            (_, PlateId) => Some("Plate ID"),
            (_, PlateName) => Some("Plate Name"),

            (SchemaVariant::Legacy, Nanoparticle) => Some("Nanoparticle"),
            (SchemaVariant::Legacy, NanoparticleId) => Some("Nanoparticle ID"),
            (SchemaVariant::Legacy, Control) => Some("Control"),
            (SchemaVariant::Legacy, InstrumentName) => Some("Instrument name"),
            (SchemaVariant::Legacy, DateSamplePreparation) => Some("Date sample preparation"),
            (SchemaVariant::Legacy, PeptideConcentration) => Some("Peptide concentration"),
            (SchemaVariant::Legacy, PeptideMassSample) => Some("Peptide mass sample"),
            (SchemaVariant::Legacy, ReconVolume) => Some("Recon volume"),
            (SchemaVariant::Legacy, DilutionFactor) => Some("Dilution factor"),
            (SchemaVariant::Legacy, KitId) => Some("Kit ID"),
            (SchemaVariant::Legacy, AssayVersion) => Some("Assay"),
            (SchemaVariant::Legacy, SampleTubeId | MethodSetId | AssayMethodId) => None,

            (SchemaVariant::Current, Nanoparticle) => Some("Nanoparticle set"),
            (SchemaVariant::Current, NanoparticleId) => Some("Nanoparticle set ID"),
            (SchemaVariant::Current, InstrumentName) => Some("Instrument ID"),
            (SchemaVariant::Current, DateSamplePreparation) => Some("Date assay initiated"),
            (SchemaVariant::Current, PeptideConcentration) => {
                Some("Reconstituted peptide concentration")
            }
            (SchemaVariant::Current, PeptideMassSample) => Some("Recovered peptide mass"),
            (SchemaVariant::Current, ReconVolume) => Some("Reconstitution volume"),
            (SchemaVariant::Current, AssayVersion) => Some("Assay product"),
            (SchemaVariant::Current, SampleTubeId) => Some("Sample tube ID"),
            (SchemaVariant::Current, MethodSetId) => Some("Method set ID"),
            (SchemaVariant::Current, AssayMethodId) => Some("Assay method ID"),
            (SchemaVariant::Current, Control | DilutionFactor | KitId) => None,
        }
    }

    fn label(self) -> &'static str {
        self.header(SchemaVariant::Legacy)
            .or_else(|| self.header(SchemaVariant::Current))
            .unwrap_or("unknown")
    }
}

/// Plate map assembled in memory instead of read from a CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateMap {
    variant: SchemaVariant,
    columns: Vec<(PlateMapAttribute, Vec<Option<String>>)>,
    len: usize,
}

impl PlateMap {
    pub fn builder(variant: SchemaVariant) -> PlateMapBuilder {
        PlateMapBuilder {
            variant,
            columns: Vec::new(),
        }
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn values(&self, attribute: PlateMapAttribute) -> &[Option<String>] {
        self.columns
            .iter()
            .find(|(attr, _)| *attr == attribute)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn to_table(&self) -> PlateMapTable {
        let present = PlateMapAttribute::ALL
            .iter()
            .filter_map(|attr| attr.header(self.variant).map(|header| (*attr, header)))
            .collect::<Vec<_>>();
        let mut table = PlateMapTable::new(
            present
                .iter()
                .map(|(_, header)| header.to_string())
                .collect(),
        );
        for row in 0..self.len {
            table.push_row(
                present
                    .iter()
                    .map(|(attr, _)| {
                        self.values(*attr)
                            .get(row)
                            .and_then(|value| value.as_deref())
                            .map(Cell::from_raw)
                            .unwrap_or(Cell::Empty)
                    })
                    .collect(),
            );
        }
        table
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), IngestError> {
        let file = File::create(path).map_err(|err| IngestError::Filesystem(err.to_string()))?;
        self.to_table().write_csv(file)
    }
}

pub struct PlateMapBuilder {
    variant: SchemaVariant,
    columns: Vec<(PlateMapAttribute, Vec<Option<String>>)>,
}

impl PlateMapBuilder {
    pub fn column<I, S>(mut self, attribute: PlateMapAttribute, values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|value| value.map(Into::into))
            .collect::<Vec<Option<String>>>();
        self.columns.retain(|(attr, _)| *attr != attribute);
        self.columns.push((attribute, values));
        self
    }

    /// Convenience for columns without gaps.
    pub fn values<I, S>(self, attribute: PlateMapAttribute, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column(attribute, values.into_iter().map(Some))
    }

    pub fn build(self) -> Result<PlateMap, IngestError> {
        let len = self
            .columns
            .iter()
            .find(|(attr, _)| *attr == PlateMapAttribute::MsFileName)
            .map(|(_, values)| values.len())
            .unwrap_or(0);
        if len == 0 {
            return Err(IngestError::EmptyPlateMap);
        }

        let mut columns = Vec::with_capacity(PlateMapAttribute::ALL.len());
        for attribute in PlateMapAttribute::ALL {
            let mut values = self
                .columns
                .iter()
                .find(|(attr, _)| *attr == attribute)
                .map(|(_, values)| values.clone())
                .unwrap_or_default();
            if values.len() > len {
                return Err(IngestError::PlateMapColumnTooLong {
                    column: attribute.label().to_string(),
                    len: values.len(),
                    files: len,
                });
            }
            values.resize(len, None);
            columns.push((attribute, values));
        }

        Ok(PlateMap {
            variant: self.variant,
            columns,
            len,
        })
    }
}
