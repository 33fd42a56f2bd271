pub mod entities;
pub mod errors;
pub mod url_codec;
pub mod value_objects;
