//! # Vizmesh Core
//!
//! Data model shared by the vizmesh crates.
//!
//! - [`DataPoint`]: a single timestamped scalar measurement
//! - [`DataSource`]: a named, identified series of data points
//! - [`Visualization`]: a chart configuration referencing a data source by id
//! - [`EntityKind`]: the namespace tag each entity is stored under
//!
//! ## Example
//!
//! ```rust
//! use vizmesh_core::{DataPoint, DataSource, Visualization};
//!
//! let source = DataSource::new("s1", "temp")
//!     .with_points(vec![DataPoint::new("p1", 100, 21.5)])
//!     .with_last_updated(100);
//! assert_eq!(source.latest_timestamp(), Some(100));
//!
//! let chart = Visualization::new("v1", "chart", "s1", "line").with_property("color", "red");
//! assert_eq!(chart.properties.get("color").map(String::as_str), Some("red"));
//! ```

pub mod model;

pub use model::{DataPoint, DataSource, EntityKind, Visualization};
