pub mod media_session;
pub mod multipart;
pub mod tapo_client;
