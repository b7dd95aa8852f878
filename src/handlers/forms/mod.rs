// handlers/forms - form definition tree endpoints
//
// Every write goes through the reconciler; the tree tables are never
// reachable from the generic /tables endpoints.

pub mod collection; // GET /form, POST /form/create
pub mod form; // GET|PUT /form/:form_id, DELETE /form/soft-delete/:form_id

pub use collection::create as form_create;
pub use collection::list as form_list;
pub use form::get as form_get;
pub use form::put as form_put;
pub use form::soft_delete as form_soft_delete;
