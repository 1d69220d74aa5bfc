pub mod campaigns;
pub mod events;
