//! Demand (units sold) feature preparation

mod calendar;
mod encoder;
mod encoding;

pub use calendar::{
    parse_iso_date, parse_week_label, CalendarFields, WeekCalendar, WEEK_LABEL_FORMAT,
};
pub use encoder::{DemandArtifacts, DemandFeatureEncoder, DemandInput, DemandModelConfig};
pub use encoding::{EncodingKey, EncodingTable, EncodingTables};
