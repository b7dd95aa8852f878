use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::database::resource::{Resource, ResourceColumn};
use crate::services::validation::{FieldErrors, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCurrency {
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "USD")]
    Usd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductFamily {
    Health,
    Travel,
    Life,
    Motor,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub product_name: String,
    pub product_code: String,
    pub currency: ProductCurrency,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_annual: bool,
    #[serde(default)]
    pub platform_fee: Option<Decimal>,
    #[serde(default)]
    pub admin_fee: Option<Decimal>,
    #[serde(default)]
    pub agency_commission: Option<Decimal>,
    #[serde(default)]
    pub assurance_charge: Option<Decimal>,
    #[serde(default)]
    pub cancellation_fee: Option<Decimal>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub bank_branch: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
    #[serde(default)]
    pub bsb: Option<String>,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub product_family: Option<ProductFamily>,
    #[serde(default)]
    pub section_definition: Option<String>,
    #[serde(default)]
    pub wording_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(flatten)]
    pub fields: ProductInput,
}

impl Resource for Product {
    type Input = ProductInput;

    const NAME: &'static str = "Product";
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [ResourceColumn] = &[
        ResourceColumn::new("product_name", "varchar").not_null(),
        ResourceColumn::unique("product_code", "varchar").not_null(),
        ResourceColumn::new("currency", "varchar").not_null(),
        ResourceColumn::new("is_active", "bool").not_null().default_to("true"),
        ResourceColumn::new("is_annual", "bool").not_null().default_to("false"),
        ResourceColumn::new("platform_fee", "numeric"),
        ResourceColumn::new("admin_fee", "numeric"),
        ResourceColumn::new("agency_commission", "numeric"),
        ResourceColumn::new("assurance_charge", "numeric"),
        ResourceColumn::new("cancellation_fee", "numeric"),
        ResourceColumn::new("bank_name", "varchar"),
        ResourceColumn::new("bank_branch", "varchar"),
        ResourceColumn::new("bank_account", "varchar"),
        ResourceColumn::new("bsb", "varchar"),
        ResourceColumn::new("parameters", "text"),
        ResourceColumn::new("product_family", "varchar"),
        ResourceColumn::new("section_definition", "text"),
        ResourceColumn::new("wording_url", "varchar")
            .not_null()
            .default_to("''::character varying"),
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn assemble(id: i64, input: ProductInput) -> Self {
        Product { id, fields: input }
    }

    fn validate(input: &ProductInput) -> Result<(), FieldErrors> {
        let mut v = Validator::new();
        v.required_text("product_name", &input.product_name, 80)
            .required_text("product_code", &input.product_code, 5)
            .decimal("platform_fee", input.platform_fee.as_ref(), 16, 2)
            .decimal("admin_fee", input.admin_fee.as_ref(), 16, 2)
            .decimal("agency_commission", input.agency_commission.as_ref(), 5, 2)
            .decimal("assurance_charge", input.assurance_charge.as_ref(), 16, 2)
            .decimal("cancellation_fee", input.cancellation_fee.as_ref(), 5, 2)
            .optional_text("bank_name", input.bank_name.as_deref(), 255)
            .optional_text("bank_branch", input.bank_branch.as_deref(), 255)
            .optional_text("bank_account", input.bank_account.as_deref(), 255)
            .optional_text("bsb", input.bsb.as_deref(), 255)
            .url("wording_url", &input.wording_url, 255, true);
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: serde_json::Value) -> ProductInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn applies_model_defaults() {
        let p = input(json!({
            "product_name": "Travel Lite",
            "product_code": "TL01",
            "currency": "USD"
        }));
        assert!(p.is_active);
        assert!(!p.is_annual);
        assert_eq!(p.wording_url, "");
        assert!(Product::validate(&p).is_ok());
    }

    #[test]
    fn rejects_unknown_currency() {
        let err = serde_json::from_value::<ProductInput>(json!({
            "product_name": "Travel Lite",
            "product_code": "TL01",
            "currency": "EUR"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn validates_code_length_and_fees() {
        let p = input(json!({
            "product_name": "Health Plus",
            "product_code": "HEALTH",
            "currency": "INR",
            "agency_commission": "1234.5",
            "platform_fee": "10.999"
        }));
        let errors = Product::validate(&p).unwrap_err();
        assert!(errors.contains_key("product_code"));
        assert!(errors.contains_key("agency_commission"));
        assert!(errors.contains_key("platform_fee"));

        let within = input(json!({
            "product_name": "Health Plus",
            "product_code": "HP",
            "currency": "INR",
            "agency_commission": "123.45"
        }));
        assert!(Product::validate(&within).is_ok());
    }

    #[test]
    fn decodes_stored_row_with_numeric_fees() {
        let product: Product = serde_json::from_value(json!({
            "id": 3,
            "product_name": "Motor",
            "product_code": "MT",
            "currency": "INR",
            "is_active": true,
            "is_annual": true,
            "platform_fee": 12.5,
            "admin_fee": null,
            "agency_commission": null,
            "assurance_charge": null,
            "cancellation_fee": null,
            "bank_name": null,
            "bank_branch": null,
            "bank_account": null,
            "bsb": null,
            "parameters": null,
            "product_family": "Motor",
            "section_definition": null,
            "wording_url": ""
        }))
        .unwrap();
        assert_eq!(product.id(), 3);
        assert_eq!(product.fields.platform_fee, Some(Decimal::new(125, 1)));
        assert_eq!(product.fields.product_family, Some(ProductFamily::Motor));
    }
}
