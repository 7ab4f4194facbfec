//! VBA Module
//!
//! Everything that deals with Office macros:
//! - Container reading (OLE2 and OOXML) with MS-OVBA decompression
//! - Extraction backends (native reader, external olevba) with fallback
//! - Module file output
//! - Procedure/variable inventory
//! - Source cleanup passes

pub mod analyzer;
pub mod container;
pub mod extractor;
pub mod optimizer;
pub mod ovba;
pub mod project;
pub mod types;
pub mod writer;

pub use analyzer::{VbaAnalysis, VbaStatistics, generate_report, generate_statistics, inventory_rows};
pub use extractor::{ExtractOptions, NativeBackend, OlevbaBackend, VbaBackend, VbaExtractor, is_supported_file};
pub use optimizer::{OptimizationKind, OptimizationOptions, OptimizationResult, optimize};
pub use types::{ExtractionMethod, ExtractionReport, ModuleKind, VbaModule};
