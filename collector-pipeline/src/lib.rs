pub mod csv_writer;
pub mod dedupe;
pub mod extract;
pub mod run;


pub use csv_writer::write_csv;
pub use dedupe::{dedupe, dedupe_report, DedupeReport};
pub use extract::{extract, ExtractOptions};
pub use run::{collect, fetch, run, Collection, RunSummary};
