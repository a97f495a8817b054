pub mod groups;
pub mod receipts;
