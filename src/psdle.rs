use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ITEMS_KEY: &str = "items";

/// A PSDLE export. Only `items` is interpreted, every other top-level
/// property is carried through untouched and in its original order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

/// One purchase record. Free-form, the date properties are looked up on demand.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

/// Which date property of an item the filter compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    /// `date`, when the item was bought.
    Purchase,
    /// `releasedate`, when the game was released.
    Release,
}

impl DateField {
    pub fn from_release_flag(release: bool) -> Self {
        if release {
            DateField::Release
        } else {
            DateField::Purchase
        }
    }

    /// Property name inside an item.
    pub fn key(self) -> &'static str {
        match self {
            DateField::Purchase => "date",
            DateField::Release => "releasedate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateField::Purchase => "purchase date",
            DateField::Release => "release date",
        }
    }
}

impl Document {
    /// Moves the items out of the document, leaving their slot in place so
    /// that [`Document::replace_items`] puts them back at the same position.
    pub fn take_items(&mut self) -> Result<Vec<Item>> {
        let slot = self
            .fields
            .get_mut(ITEMS_KEY)
            .ok_or_else(|| anyhow!("JSON data does not contain property \"{ITEMS_KEY}\""))?;

        let values = match slot.take() {
            Value::Array(values) => values,
            other => {
                let kind = json_kind(&other);
                *slot = other;
                bail!("property \"{ITEMS_KEY}\" is not an array but {kind}");
            }
        };

        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match value {
                Value::Object(map) => Ok(Item(map)),
                other => Err(anyhow!(
                    "item {} is not an object but {}",
                    index + 1,
                    json_kind(&other)
                )),
            })
            .collect()
    }

    pub fn replace_items(&mut self, items: Vec<Item>) {
        let values = items.into_iter().map(Value::from).collect();
        self.fields.insert(ITEMS_KEY.to_string(), Value::Array(values));
    }
}

impl Item {
    /// Raw value of the selected date property, `None` when the item lacks it.
    pub fn date_value(&self, field: DateField) -> Option<&Value> {
        self.0.get(field.key())
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        Value::Object(item.0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn take_and_replace_keeps_key_order() {
        let mut doc = document(json!({
            "version": 1,
            "items": [{"name": "a"}, {"name": "b"}],
            "columns": ["name"]
        }));

        let mut items = doc.take_items().unwrap();
        assert_eq!(items.len(), 2);
        items.remove(0);
        doc.replace_items(items);

        let out = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            out,
            r#"{"version":1,"items":[{"name":"b"}],"columns":["name"]}"#
        );
    }

    #[test]
    fn numbers_keep_their_exact_text() {
        let input = r#"{"items":[{"size":123456789012345678901234,"price":9.90}]}"#;
        let mut doc: Document = serde_json::from_str(input).unwrap();

        let items = doc.take_items().unwrap();
        doc.replace_items(items);

        assert_eq!(serde_json::to_string(&doc).unwrap(), input);
    }

    #[test]
    fn missing_items_is_an_error() {
        let mut doc = document(json!({"columns": []}));
        let err = doc.take_items().unwrap_err();
        assert!(err.to_string().contains("\"items\""));
    }

    #[test]
    fn items_must_be_an_array_of_objects() {
        let mut doc = document(json!({"items": {"date": "x"}}));
        assert!(doc.take_items().is_err());

        let mut doc = document(json!({"items": [{"date": "x"}, 3]}));
        let err = doc.take_items().unwrap_err();
        assert_eq!(err.to_string(), "item 2 is not an object but a number");
    }

    #[test]
    fn date_value_follows_field() {
        let item: Item = serde_json::from_value(json!({
            "date": "2019-01-01T00:00:00+0000",
            "releasedate": "2015-05-05T00:00:00+0000"
        }))
        .unwrap();

        assert_eq!(
            item.date_value(DateField::Purchase),
            Some(&json!("2019-01-01T00:00:00+0000"))
        );
        assert_eq!(
            item.date_value(DateField::Release),
            Some(&json!("2015-05-05T00:00:00+0000"))
        );

        let item: Item = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(item.date_value(DateField::Release), None);
    }

    #[test]
    fn field_from_flag() {
        assert_eq!(DateField::from_release_flag(true).key(), "releasedate");
        assert_eq!(DateField::from_release_flag(false).key(), "date");
    }
}
