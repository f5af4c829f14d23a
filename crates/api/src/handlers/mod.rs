pub mod admin_data;
pub mod catalog;
pub mod dealer_config;
pub mod dealer_pricing;
pub mod dealers;
