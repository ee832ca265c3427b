mod handler;
mod model;

pub use handler::{
    EventsQuery, SeriesQuery, beverages, create_event, current, get_profile, list_events, series,
    update_profile,
};
pub use model::{CurrentLevel, EventView, NewEventRequest, ProfileUpdateRequest};
