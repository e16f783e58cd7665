use crate::config::{ExtractionConfig, FieldScope};
use crate::error::{KtViewError, Result};
use crate::table::{Record, Table};
use roxmltree::{Document, Node, ParsingOptions};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Turns an XML document into a [`Table`] according to an [`ExtractionConfig`].
///
/// Element and attribute names are compared by local name, so namespace
/// prefixes in the source document do not matter.
pub struct AttributeExtractor {
    rules: ExtractionConfig,
}

impl AttributeExtractor {
    pub fn new(rules: ExtractionConfig) -> Self {
        Self { rules }
    }

    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Table> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| KtViewError::Extraction {
            path: path.display().to_string(),
            message: format!("cannot read document: {}", e),
        })?;
        let text = std::str::from_utf8(&bytes).map_err(|e| KtViewError::Extraction {
            path: path.display().to_string(),
            message: format!("document is not valid UTF-8: {}", e),
        })?;

        let table = self.extract_named(text, &path.display().to_string())?;
        Ok(table.with_source(path))
    }

    pub fn extract(&self, source: &str) -> Result<Table> {
        self.extract_named(source, "<input>")
    }

    fn extract_named(&self, source: &str, name: &str) -> Result<Table> {
        let start = Instant::now();
        let mut options = ParsingOptions::default();
        options.allow_dtd = true;

        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let doc = Document::parse_with_options(source, options).map_err(|e| KtViewError::Extraction {
            path: name.to_string(),
            message: e.to_string(),
        })?;

        let rows: Vec<Record> = doc
            .descendants()
            .filter(|node| node.is_element() && node.tag_name().name() == self.rules.entity_tag)
            .map(|entity| self.record_for(entity))
            .collect();

        info!(
            "Extracted {} <{}> records from {} in {:?}",
            rows.len(),
            self.rules.entity_tag,
            name,
            start.elapsed()
        );

        Table::new(self.rules.header(), rows)
    }

    fn record_for(&self, entity: Node<'_, '_>) -> Record {
        let id = attribute_value(entity, &self.rules.id_attribute);

        let fields = self.rules.fields.iter().map(|rule| {
            self.find_field(entity, &rule.tag)
                .map(|field| attribute_value(field, &self.rules.value_attribute))
                .unwrap_or_default()
        });

        let record: Record = std::iter::once(id).chain(fields).collect();
        debug!("Record {:?}", record.cells());
        record
    }

    /// First element below `entity` named `tag`; later duplicates are ignored.
    fn find_field<'a, 'input>(&self, entity: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
        let is_field = |node: &Node<'a, 'input>| node.is_element() && node.tag_name().name() == tag;
        match self.rules.field_scope {
            FieldScope::Children => entity.children().find(is_field),
            FieldScope::Descendants => entity.descendants().skip(1).find(is_field),
        }
    }
}

impl Default for AttributeExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

fn attribute_value(node: Node<'_, '_>, name: &str) -> String {
    node.attributes()
        .find(|attr| attr.name() == name)
        .map(|attr| attr.value().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldRule;
    use tempfile::TempDir;

    const SCENARIO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ehd:root xmlns:ehd="urn:ehd/001" xmlns="urn:ehd/kts/001">
  <ehd:body>
    <kostentraeger V="1">
      <name V="AOK Nord"/>
      <CTY V="Kiel"/>
      <ik V="123"/>
    </kostentraeger>
    <kostentraeger V="2">
      <name V="LKK Bayern"/>
      <kurzname V="LKK"/>
      <CTY V="München"/>
      <ik V="456"/>
    </kostentraeger>
  </ehd:body>
</ehd:root>"#;

    #[test]
    fn test_scenario_rows() {
        let table = AttributeExtractor::default().extract(SCENARIO).unwrap();

        assert_eq!(table.header(), ["Kostenträger-ID", "Name", "Kurzname", "Ort", "IK"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0].cells(), ["1", "AOK Nord", "", "Kiel", "123"]);
        assert_eq!(table.rows()[1].cells(), ["2", "LKK Bayern", "LKK", "München", "456"]);
    }

    #[test]
    fn test_prefixed_names_match_by_local_name() {
        let xml = r#"<x:list xmlns:x="urn:a" xmlns:y="urn:b">
            <x:kostentraeger y:V="10"><y:name y:V="Prefixed"/></x:kostentraeger>
        </x:list>"#;
        let table = AttributeExtractor::default().extract(xml).unwrap();

        assert_eq!(table.rows()[0].cells(), ["10", "Prefixed", "", "", ""]);
    }

    #[test]
    fn test_nested_entities_in_document_order() {
        let xml = r#"<root>
            <group><deep><kostentraeger V="a"/></deep></group>
            <other><kostentraeger V="b"><kostentraeger V="c"/></kostentraeger></other>
        </root>"#;
        let table = AttributeExtractor::default().extract(xml).unwrap();

        let ids: Vec<&str> = table.rows().iter().map(Record::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_first_matching_child_wins() {
        let xml = r#"<root><kostentraeger V="1"><name V="first"/><name V="second"/></kostentraeger></root>"#;
        let table = AttributeExtractor::default().extract(xml).unwrap();
        assert_eq!(table.cell_at(0, 1).unwrap(), "first");
    }

    #[test]
    fn test_missing_values_are_empty_strings() {
        let xml = r#"<root><kostentraeger><name/></kostentraeger></root>"#;
        let table = AttributeExtractor::default().extract(xml).unwrap();
        assert_eq!(table.rows()[0].cells(), ["", "", "", "", ""]);
    }

    #[test]
    fn test_field_scope() {
        let xml = r#"<root><kostentraeger V="1"><anschrift><CTY V="Kiel"/></anschrift></kostentraeger></root>"#;

        let children = AttributeExtractor::default().extract(xml).unwrap();
        assert_eq!(children.cell_at(0, 3).unwrap(), "");

        let rules = ExtractionConfig {
            field_scope: FieldScope::Descendants,
            ..ExtractionConfig::default()
        };
        let descendants = AttributeExtractor::new(rules).extract(xml).unwrap();
        assert_eq!(descendants.cell_at(0, 3).unwrap(), "Kiel");
    }

    #[test]
    fn test_no_matches_gives_header_only_table() {
        let table = AttributeExtractor::default()
            .extract("<root><something V=\"1\"/></root>")
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 5);
    }

    #[test]
    fn test_malformed_document_fails() {
        let result = AttributeExtractor::default().extract("<root><kostentraeger V=\"1\"></root>");
        assert!(matches!(result, Err(KtViewError::Extraction { .. })));
    }

    #[test]
    fn test_custom_schema() {
        let rules = ExtractionConfig {
            entity_tag: "item".to_string(),
            id_attribute: "key".to_string(),
            id_header: "Key".to_string(),
            value_attribute: "value".to_string(),
            field_scope: FieldScope::Children,
            fields: vec![FieldRule {
                header: "Label".to_string(),
                tag: "label".to_string(),
            }],
        };
        let xml = r#"<items><item key="k1"><label value="One"/></item><item key="k2"/></items>"#;
        let table = AttributeExtractor::new(rules).extract(xml).unwrap();

        assert_eq!(table.header(), ["Key", "Label"]);
        assert_eq!(table.rows()[0].cells(), ["k1", "One"]);
        assert_eq!(table.rows()[1].cells(), ["k2", ""]);
    }

    #[test]
    fn test_extract_file_with_bom_and_doctype() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kt.xml");
        let xml = "\u{feff}<?xml version=\"1.0\"?><!DOCTYPE root><root><kostentraeger V=\"7\"/></root>";
        std::fs::write(&path, xml).unwrap();

        let table = AttributeExtractor::default().extract_file(&path).unwrap();
        assert_eq!(table.row(0).unwrap().id(), "7");
        assert_eq!(table.source(), Some(path.as_path()));
    }

    #[test]
    fn test_unreadable_file_is_an_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kt.xml");
        std::fs::create_dir(&path).unwrap();

        let result = AttributeExtractor::default().extract_file(&path);
        assert!(matches!(result, Err(KtViewError::Extraction { .. })));

        let missing = AttributeExtractor::default().extract_file(temp_dir.path().join("gone.xml"));
        assert!(matches!(missing, Err(KtViewError::Extraction { .. })));
    }

    #[test]
    fn test_extract_file_rejects_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("latin1.xml");
        std::fs::write(&path, b"<root><kostentraeger V=\"M\xfcnchen\"/></root>").unwrap();

        let result = AttributeExtractor::default().extract_file(&path);
        assert!(matches!(result, Err(KtViewError::Extraction { .. })));
    }
}
