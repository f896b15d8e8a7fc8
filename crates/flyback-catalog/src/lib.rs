//! Magnetic core catalog for the flyback designer.
//!
//! The catalog supplies [`CoreSelection`](flyback_magnetics::CoreSelection)
//! records to the electromagnetic and winding stages. A bundled set of
//! common EE/EI/ETD/PQ cores is available through [`MemoryCatalog::builtin`];
//! custom catalogs load from a JSON array of core records.
//!
//! # Example
//!
//! ```
//! use flyback_catalog::{CoreCatalog, MemoryCatalog};
//!
//! let catalog = MemoryCatalog::builtin().unwrap();
//! let core = catalog.lookup("etd29").unwrap();
//! assert_eq!(core.model, "ETD29");
//! ```

pub mod catalog;
pub mod error;

pub use catalog::{CoreCatalog, MemoryCatalog};
pub use error::{CatalogError, Result};
