pub mod reconciler;
pub mod tables;
pub mod validation;

pub use reconciler::{FormService, ReconcileError, ReconcileReport, Reconciled};
pub use tables::{TableError, TableService};
pub use validation::{validate_form, FieldErrors, Validator};
