pub mod coerce;
pub mod display;
pub mod model;

pub use coerce::{coerce, parse_bool, parse_bool_strict, parse_date, parse_number, set_value};
pub use display::{
    display_value, satisfies_required, validate_values, ValidationIssue, EMPTY_DISPLAY,
};
pub use model::{
    MediaRef, MultipleValue, RelatedRowLink, Row, RowValue, TypedValue, ValueField, ValueRange,
};
