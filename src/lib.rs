pub mod dom;
pub mod form;
pub mod message;
pub mod settings;
pub mod site;
pub mod store;
pub mod validate;
