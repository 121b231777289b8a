pub mod backup;
pub mod charts;
pub mod fetcher;
pub mod history_store;
pub mod integrity;
pub mod report;
pub mod secrets;
pub mod youtube_service;
