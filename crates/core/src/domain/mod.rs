pub mod conversation;
pub mod lead;
