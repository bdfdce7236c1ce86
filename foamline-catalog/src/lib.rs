pub mod packages;
pub mod slots;
pub mod travel;

pub use packages::{FoamPackage, PackageCatalog};
pub use slots::{DayAvailability, SlotCatalog};
pub use travel::{TravelPolicy, TravelQuote};
