//! Object name addressing.
//!
//! A wire name joins a resource (the registered object, e.g. `demo.Calc`)
//! and a member path (a property, method, or signal, e.g. `add`) with a
//! `/`: `demo.Calc/add`.  A name without a `/` addresses the resource
//! itself.

/// The resource part of a name: everything before the first `/`.
///
/// A name without a `/` is its own resource.
pub fn resource_from_name(name: &str) -> &str {
    match name.find('/') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// The member path of a name: everything after the last `/`.
///
/// A name without a `/` yields the whole string.
pub fn path_from_name(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// True when the name addresses a member rather than a bare resource.
pub fn has_path(name: &str) -> bool {
    name.contains('/')
}

/// Join a resource and a member path into a wire name.
pub fn create_name(resource: &str, path: &str) -> String {
    format!("{resource}/{path}")
}
