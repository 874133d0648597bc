//! Page handlers, grouped by resource.

pub mod campgrounds;
