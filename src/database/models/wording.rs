use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::resource::{Resource, ResourceColumn};
use crate::services::validation::{FieldErrors, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordingCurrency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "GBP")]
    Gbp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordingProduct {
    ProductA,
    ProductB,
    ProductC,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordingInput {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub currency: Option<WordingCurrency>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    pub external_id: String,
    #[serde(default)]
    pub last_modified_by: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    pub product: WordingProduct,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub wording_full_name: Option<String>,
    pub wording_name: String,
    #[serde(default)]
    pub wording_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wording {
    pub id: i64,
    #[serde(flatten)]
    pub fields: WordingInput,
}

impl Resource for Wording {
    type Input = WordingInput;

    const NAME: &'static str = "Wording";
    const TABLE: &'static str = "wordings";
    const COLUMNS: &'static [ResourceColumn] = &[
        ResourceColumn::new("active", "bool").not_null().default_to("false"),
        ResourceColumn::new("created_by", "varchar"),
        ResourceColumn::new("currency", "varchar"),
        ResourceColumn::new("default", "bool").not_null().default_to("false"),
        ResourceColumn::new("expiry_date", "date"),
        ResourceColumn::unique("external_id", "varchar").not_null(),
        ResourceColumn::new("last_modified_by", "varchar"),
        ResourceColumn::new("owner", "varchar"),
        ResourceColumn::new("product", "varchar").not_null(),
        ResourceColumn::new("start_date", "date").not_null(),
        ResourceColumn::new("wording_full_name", "varchar"),
        ResourceColumn::new("wording_name", "varchar").not_null(),
        ResourceColumn::new("wording_url", "varchar")
            .not_null()
            .default_to("''::character varying"),
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn assemble(id: i64, input: WordingInput) -> Self {
        Wording { id, fields: input }
    }

    fn validate(input: &WordingInput) -> Result<(), FieldErrors> {
        let mut v = Validator::new();
        v.optional_text("created_by", input.created_by.as_deref(), 100)
            .required_text("external_id", &input.external_id, 50)
            .optional_text("last_modified_by", input.last_modified_by.as_deref(), 100)
            .optional_text("owner", input.owner.as_deref(), 100)
            .optional_text("wording_full_name", input.wording_full_name.as_deref(), 255)
            .required_text("wording_name", &input.wording_name, 80)
            .url("wording_url", &input.wording_url, 255, true);
        v.finish()
    }
}
