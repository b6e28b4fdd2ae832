//! Coordinate systems and map projections for chart rendering.
//!
//! Implements the projections from scratch without external dependencies:
//! Lambert93, Web Mercator, World Mercator and UTM, plus the identity and
//! axis-swap passthroughs used for geographic coordinates.

pub mod ellipsoid;
pub mod error;
pub mod lambert;
pub mod mercator;
pub mod position;
pub mod system;
pub mod utm;

pub use ellipsoid::{Ellipsoid, GRS80, WGS84};
pub use error::{ProjectionError, ProjectionResult};
pub use lambert::Lambert93;
pub use mercator::{WebMercator, WorldMercator};
pub use position::Position;
pub use system::CoordinateSystem;
pub use utm::{Hemisphere, Utm, UtmZone};
