// handlers/tables - runtime table introspection and row access

pub mod catalog; // GET /tables, GET /tables/:table/fields
pub mod rows; // GET|POST /tables/:table/rows, PUT /tables/:table/rows/:id

pub use catalog::fields as table_fields;
pub use catalog::list as table_list;
pub use rows::get as rows_get;
pub use rows::post as rows_post;
pub use rows::put as rows_put;
