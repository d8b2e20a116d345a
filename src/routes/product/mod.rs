mod handler;
mod model;

pub use handler::{get_product, list_products, place_order};
pub use model::{OrderResponse, ProductResponse, ProductsResponse};
