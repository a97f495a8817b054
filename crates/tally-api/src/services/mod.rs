pub mod receipt_ingestion;
