//! Ruling core: IO-free domain model, listing parsing and the reformat engine.
mod document;
mod era;
mod listing;
mod model;
mod pagination;
pub mod reformat;

pub use document::{Section, SectionKind, StructuredDocument};
pub use era::{format_era_date, parse_era_date, to_era, EraDate, EraDateError, DEFAULT_ERA_OFFSET};
pub use listing::{odd_rows, parse_result_rows, parse_size_bytes, ListingError};
pub use model::{DateWindow, DateWindowError, RulingContent, RulingLink, RulingMetadata};
pub use pagination::{expand_page_urls, PaginationError};
pub use reformat::{reformat, Landmark, ReformatError, Reformatter, RulingReformatter};
