//! Decoders that turn wire-level data into the domain model (§4.7, §4.8).

pub mod eprom;
pub mod live;
