pub mod form;
pub mod product;
pub mod table;
pub mod wording;

pub use form::{FormInput, FormTree};
pub use product::Product;
pub use table::{FieldDescription, TableColumn};
pub use wording::Wording;
