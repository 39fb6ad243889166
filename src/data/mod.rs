//! Data module - yearly CSV loading and processing

mod loader;
mod processor;

pub use loader::{
    discover_files, load_dataset, sample_rows, year_from_file_name, DataLoader, LoaderError,
    SourceFile,
};
pub use processor::{Aggregate, DataProcessor, ProcessorError, DELAY_CAUSES};
