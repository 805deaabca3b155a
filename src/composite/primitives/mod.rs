//! Reusable steps and templates built on the composite core.
//!
//! Guards and expose helpers return plain [`Step`](super::Step)s. Everything
//! that produces `#`-prefixed outputs is a template call, so its outputs
//! can be renamed with `.outputs(...)` at the call site:
//!
//! ```ignore
//! CompositeBuilder::new("Album.duration")
//!     .step(with_property_from_list("tracks", "duration"))
//!     .step(with_sum("#values"))
//!     .step(expose_dependency("#sum"))
//!     .build_in(&scope)?;
//! ```

mod control;
mod list;
mod object;
mod reference;

pub use control::{
    exit_without_dependency, expose_constant, expose_dependency, expose_dependency_or_continue,
    expose_update_value_or_continue, raise_output_without_dependency,
    with_result_of_availability_check,
};
pub use list::{
    with_filtered_list, with_flattened_list, with_mapped_list, with_sum, with_unique_items_only,
};
pub use object::{with_property_from_list, with_property_from_object};
pub use reference::{
    NotFoundMode, find_reference, with_directory_from_name, with_resolved_reference,
    with_resolved_reference_list, with_reverse_reference_list,
};
