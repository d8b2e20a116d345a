pub mod home;
pub mod product;
