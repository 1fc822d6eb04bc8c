pub mod model;
pub mod validate;
pub mod visibility;

pub use model::{
    Entity, EntityRelationship, EntityView, Property, PropertyFlags, PropertyOption,
    PropertySubtype, PropertyType, ATTR_COLUMNS, ATTR_DEFAULT_VALUE, ATTR_GROUP,
};
pub use validate::{validate_entity, SchemaError};
pub use visibility::{is_visible, visible_properties, FormContext};
