pub mod download_op;
pub mod list_op;
pub mod op_helper;
