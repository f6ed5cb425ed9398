/*!
 * Per-row translation: the unit of work handed to pool workers.
 */

use log::error;

use super::model::TranslationModel;
use crate::database::models::Row;
use crate::errors::TranslationError;

/// Columns translated by default
pub const DEFAULT_TRANSLATED_FIELDS: [&str; 3] = ["verdachte", "beslissing", "strafmaat"];

/// Result of translating one row
#[derive(Debug)]
pub struct RowOutcome {
    /// Original row with the translated columns appended
    pub row: Row,
    /// Error that blanked this row's translations, if any
    pub error: Option<TranslationError>,
}

impl RowOutcome {
    /// Whether translation failed for this row
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Translates the designated fields of a row
#[derive(Debug, Clone)]
pub struct RowTranslator {
    fields: Vec<String>,
    output_columns: Vec<String>,
}

impl RowTranslator {
    /// Translator for `fields`, writing `<field>_<target_language>` columns
    pub fn new(fields: Vec<String>, target_language: &str) -> Self {
        let output_columns = fields
            .iter()
            .map(|f| format!("{}_{}", f, target_language))
            .collect();
        Self {
            fields,
            output_columns,
        }
    }

    /// Source fields, in order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Names of the appended columns, in field order
    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    /// Translate one row.
    ///
    /// Empty or whitespace-only fields (NULL and missing columns included)
    /// become "" without a model call. If any model call fails, every
    /// translated column is "" and the row is still returned.
    pub fn translate_row(&self, row: &Row, model: &dyn TranslationModel) -> RowOutcome {
        let translations = self
            .fields
            .iter()
            .map(|field| {
                let text = row.get(field).map(|v| v.as_text()).unwrap_or_default();
                if text.trim().is_empty() {
                    Ok(String::new())
                } else {
                    model.translate(&text)
                }
            })
            .collect::<Result<Vec<_>, _>>();

        let (translations, error) = match translations {
            Ok(translations) => (translations, None),
            Err(e) => {
                error!("row translation failed row_id={} error={}", row.id(), e);
                (vec![String::new(); self.fields.len()], Some(e))
            }
        };

        let mut output = row.clone();
        for (column, value) in self.output_columns.iter().zip(translations) {
            output.push(column.clone(), value);
        }

        RowOutcome { row: output, error }
    }
}
