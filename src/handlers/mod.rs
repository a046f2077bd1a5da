pub mod parse_event;
