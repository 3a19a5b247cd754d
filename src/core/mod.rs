pub mod batch_runner;
pub mod device_client;
