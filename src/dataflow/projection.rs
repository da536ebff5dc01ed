use serde::{Deserialize, Serialize};

use super::RawRecord;

/// A card flattened to the fields we persist.
///
/// Field order is the JSON key order and the CSV column order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Card {
    pub id: String,
    pub name: String,
    pub set_name: String,
    pub set_id: String,
    pub number: String,
    pub image_small: String,
    pub image_large: String,
    pub supertype: String,
    pub subtypes: Vec<String>,
    pub hp: String,
    pub types: Vec<String>,
}

impl From<&RawRecord> for Card {
    fn from(record: &RawRecord) -> Self {
        let text = |field: &Option<String>| field.clone().unwrap_or_default();
        let set = record.set.clone().unwrap_or_default();
        let images = record.images.clone().unwrap_or_default();

        Card {
            id: text(&record.id),
            name: text(&record.name),
            set_name: set.name.unwrap_or_default(),
            set_id: set.id.unwrap_or_default(),
            number: text(&record.number),
            image_small: images.small.unwrap_or_default(),
            image_large: images.large.unwrap_or_default(),
            supertype: text(&record.supertype),
            subtypes: record.subtypes.clone().unwrap_or_default(),
            hp: text(&record.hp),
            types: record.types.clone().unwrap_or_default(),
        }
    }
}

/// Flattens every record, 1:1 and in order
pub(crate) fn project(records: &[RawRecord]) -> Vec<Card> {
    records.iter().map(Card::from).collect()
}
