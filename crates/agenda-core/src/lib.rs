//! Core types: civil time, date resolution, command grammar, events, formatting

pub mod civil;
pub mod dates;
pub mod event;
pub mod format;
pub mod grammar;
pub mod tracing;

pub use civil::{CivilOffset, EventTime, ParsedInstant, TimeWindow};
pub use dates::{DateError, DateResult, DateTimeResolver};
pub use event::{
    CalendarEventRef, EventDraft, EventError, EventMetadata, EventPatch, InsertedEvent,
    MatchPolicy, PatchedEvent, SearchQuery,
};
pub use format::{AgendaFormatter, FormatOptions};
pub use grammar::{Action, Command};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
