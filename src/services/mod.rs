pub mod calendar_service;
