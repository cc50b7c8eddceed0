use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::{SampleRegistration, columns};
use crate::schema::ValidatedPlateMap;
use crate::table::PlateMapTable;

const RESERVED_FIELDS: &[&str] = &["plateID", "sampleID", "sampleName", "sampleUserGroup"];

/// Builds one sample registration per unique sample id, in plate-map order.
///
/// Rows of `description` are joined on sample name; every other description
/// column becomes a custom field keyed by its [`camel_case`] header.
pub fn extract(
    plate_id: &str,
    plate_map: &ValidatedPlateMap,
    space: Option<&str>,
    description: Option<&PlateMapTable>,
) -> Vec<SampleRegistration> {
    let table = plate_map.table();
    let descriptions = description.map(DescriptionIndex::new);
    let mut seen = HashSet::new();
    let mut samples = Vec::new();

    for row in 0..table.len() {
        let sample_id = table.text(row, columns::SAMPLE_ID).unwrap_or_default();
        if !seen.insert(sample_id.clone()) {
            continue;
        }
        let sample_name = table.text(row, columns::SAMPLE_NAME).unwrap_or_default();
        let custom_fields = descriptions
            .as_ref()
            .map(|index| index.fields_for(&sample_name))
            .unwrap_or_default();

        samples.push(SampleRegistration {
            plate_id: plate_id.to_string(),
            sample_id,
            sample_name,
            space: space.map(str::to_string),
            custom_fields,
        });
    }
    samples
}

struct DescriptionIndex<'a> {
    table: &'a PlateMapTable,
    name_column: Option<usize>,
    rows_by_name: HashMap<String, usize>,
}

impl<'a> DescriptionIndex<'a> {
    fn new(table: &'a PlateMapTable) -> Self {
        let canonical = squash(columns::SAMPLE_NAME);
        let name_column = table
            .headers()
            .iter()
            .position(|header| squash(header) == canonical);
        let mut rows_by_name = HashMap::new();
        if let Some(index) = name_column {
            for (row, cells) in table.rows().iter().enumerate() {
                if let Some(name) = cells[index].text() {
                    rows_by_name.entry(name).or_insert(row);
                }
            }
        }
        Self {
            table,
            name_column,
            rows_by_name,
        }
    }

    fn fields_for(&self, sample_name: &str) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let Some(&row) = self.rows_by_name.get(sample_name) else {
            return fields;
        };
        let cells = &self.table.rows()[row];
        for (index, header) in self.table.headers().iter().enumerate() {
            if Some(index) == self.name_column {
                continue;
            }
            let key = camel_case(header);
            if key.is_empty() || RESERVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            fields
                .entry(key)
                .or_insert_with(|| cells[index].text().unwrap_or_default());
        }
        fields
    }
}

fn squash(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<String>()
        .to_lowercase()
}

/// Converts a free-form column header into a lower camel case field name.
///
/// Runs of `_` and `-` act as word breaks, a letter is capitalised when it
/// does not follow another cased letter, spaces are dropped and the first
/// character is lowercased.
pub fn camel_case(value: &str) -> String {
    let mut spaced = String::with_capacity(value.len());
    let mut in_separator = false;
    for ch in value.chars() {
        if ch == '_' || ch == '-' {
            if !in_separator {
                spaced.push(' ');
            }
            in_separator = true;
        } else {
            spaced.push(ch);
            in_separator = false;
        }
    }

    let mut titled = String::with_capacity(spaced.len());
    let mut previous_cased = false;
    for ch in spaced.chars() {
        let cased = ch.is_uppercase() || ch.is_lowercase();
        if cased && previous_cased {
            titled.extend(ch.to_lowercase());
        } else if cased {
            titled.extend(ch.to_uppercase());
        } else {
            titled.push(ch);
        }
        previous_cased = cased;
    }

    let mut chars = titled.chars().filter(|ch| *ch != ' ');
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
