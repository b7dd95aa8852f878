// handlers/resources - CRUD for the fixed resources (products, wordings)
//
// Handlers are generic over the resource type and mounted once per type.

pub mod collection; // GET|POST /{resource}
pub mod record; // GET|PUT|DELETE /{resource}/:id

pub use collection::create as resource_create;
pub use collection::list as resource_list;
pub use record::delete as resource_delete;
pub use record::get as resource_get;
pub use record::put as resource_put;
