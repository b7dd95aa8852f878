use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use crate::database::manager::DatabaseManager;
use crate::database::models::form::{ColumnInput, FieldInput, FormInput, RowInput, SectionInput};

/// Field path (e.g. `sections[0].rows[1].row_order`) to message
pub type FieldErrors = HashMap<String, String>;

pub const ROW_ORDER_RANGE: RangeInclusive<i32> = 1..=3;
pub const COLUMN_ORDER_RANGE: RangeInclusive<i32> = 1..=3;

const NAME_MAX_LENGTH: usize = 255;
const DATA_TYPE_MAX_LENGTH: usize = 64;
const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

/// Collects every problem in a payload before anything is written
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) -> &mut Self {
        // First error per path wins
        self.errors.entry(path.into()).or_insert_with(|| message.into());
        self
    }

    pub fn required_text(&mut self, path: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.add(path, "This field may not be blank.");
        } else {
            self.max_length(path, value, max);
        }
        self
    }

    pub fn optional_text(&mut self, path: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            self.max_length(path, value, max);
        }
        self
    }

    fn max_length(&mut self, path: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(path, format!("Ensure this field has no more than {} characters.", max));
        }
    }

    /// Absolute URL with a web/ftp scheme; empty allowed only when `allow_empty`
    pub fn url(&mut self, path: &str, value: &str, max: usize, allow_empty: bool) -> &mut Self {
        if value.is_empty() {
            if !allow_empty {
                self.add(path, "This field may not be blank.");
            }
            return self;
        }
        self.max_length(path, value, max);
        match url::Url::parse(value) {
            Ok(parsed) if URL_SCHEMES.contains(&parsed.scheme()) => {}
            _ => {
                self.add(path, "Enter a valid URL.");
            }
        }
        self
    }

    pub fn range(&mut self, path: &str, value: i32, range: &RangeInclusive<i32>) -> &mut Self {
        if !range.contains(&value) {
            self.add(
                path,
                format!("Ensure this value is between {} and {}.", range.start(), range.end()),
            );
        }
        self
    }

    /// Same limits as a NUMERIC(max_digits, places) column
    pub fn decimal(&mut self, path: &str, value: Option<&Decimal>, max_digits: u32, places: u32) -> &mut Self {
        let Some(value) = value else {
            return self;
        };
        let normalized = value.normalize();
        let scale = normalized.scale();
        let digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
        let whole_digits = digits.saturating_sub(scale);

        if scale > places {
            self.add(path, format!("Ensure that there are no more than {} decimal places.", places));
        } else if whole_digits > max_digits - places {
            self.add(
                path,
                format!(
                    "Ensure that there are no more than {} digits before the decimal point.",
                    max_digits - places
                ),
            );
        }
        self
    }

    pub fn identifier(&mut self, path: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            if !DatabaseManager::is_valid_identifier(value) {
                self.add(path, "Enter a valid table name.");
            }
        }
        self
    }

    /// Rejects the same id appearing twice in one child list
    fn unique_ids<I>(&mut self, path: &str, ids: I) -> &mut Self
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        let mut seen = HashSet::new();
        for (index, id) in ids.into_iter().enumerate() {
            if let Some(id) = id {
                if !seen.insert(id) {
                    self.add(format!("{}[{}].id", path, index), format!("Duplicate id {}.", id));
                }
            }
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Validate a whole form submission, every level included
pub fn validate_form(input: &FormInput) -> Result<(), FieldErrors> {
    let mut v = Validator::new();
    v.required_text("form_name", &input.attrs.form_name, NAME_MAX_LENGTH)
        .url("submit_api_route", &input.attrs.submit_api_route, 2048, false)
        .identifier("table_name", input.attrs.table_name.as_deref())
        .unique_ids("sections", input.sections.iter().map(|s| s.id));

    for (i, section) in input.sections.iter().enumerate() {
        validate_section(&mut v, &format!("sections[{}]", i), section);
    }
    v.finish()
}

fn validate_section(v: &mut Validator, path: &str, section: &SectionInput) {
    v.required_text(&format!("{}.section_name", path), &section.attrs.section_name, NAME_MAX_LENGTH)
        .unique_ids(&format!("{}.rows", path), section.rows.iter().map(|r| r.id));

    for (i, row) in section.rows.iter().enumerate() {
        validate_row(v, &format!("{}.rows[{}]", path, i), row);
    }
}

fn validate_row(v: &mut Validator, path: &str, row: &RowInput) {
    v.required_text(&format!("{}.row_name", path), &row.attrs.row_name, NAME_MAX_LENGTH)
        .range(&format!("{}.row_order", path), row.attrs.row_order, &ROW_ORDER_RANGE)
        .unique_ids(&format!("{}.columns", path), row.columns.iter().map(|c| c.id));

    for (i, column) in row.columns.iter().enumerate() {
        validate_column(v, &format!("{}.columns[{}]", path, i), column);
    }
}

fn validate_column(v: &mut Validator, path: &str, column: &ColumnInput) {
    v.required_text(&format!("{}.column_name", path), &column.attrs.column_name, NAME_MAX_LENGTH)
        .range(&format!("{}.column_order", path), column.attrs.column_order, &COLUMN_ORDER_RANGE)
        .unique_ids(&format!("{}.fields", path), column.fields.iter().map(|f| f.id));

    for (i, field) in column.fields.iter().enumerate() {
        validate_field(v, &format!("{}.fields[{}]", path, i), field);
    }
}

fn validate_field(v: &mut Validator, path: &str, field: &FieldInput) {
    if field.attrs.config.is_null() {
        v.add(format!("{}.config", path), "This field may not be null.");
    }
    v.optional_text(&format!("{}.data_type", path), field.attrs.data_type.as_deref(), DATA_TYPE_MAX_LENGTH);
    if let Some(max_length) = field.attrs.max_length {
        if max_length <= 0 {
            v.add(format!("{}.max_length", path), "Ensure this value is greater than 0.");
        }
    }
}
